//! Template compilation seam.
//!
//! Turning a template into a render function is the job of a real template
//! compiler. The dev server only needs a module exporting `render`.

use kite_graph::ModuleId;

use crate::error::Result;
use crate::sfc::SfcBlock;

/// Compiles a component template into a module exporting `render`.
///
/// The output may import bare specifiers; it is passed through the import
/// rewriter afterwards like any other script.
pub trait TemplateCompiler: Send + Sync {
    fn compile(&self, id: &ModuleId, template: &SfcBlock) -> Result<String>;
}

/// Renders the template markup as a static vnode.
///
/// Interpolations and directives are left as literal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTemplateCompiler;

impl TemplateCompiler for StaticTemplateCompiler {
    fn compile(&self, _id: &ModuleId, template: &SfcBlock) -> Result<String> {
        let html = serde_json::Value::from(template.content.trim());
        Ok(format!(
            "import {{ createStaticVNode }} from \"vue\";\n\
             const __html = {html};\n\
             export function render() {{\n\
             \x20 return createStaticVNode(__html, 1);\n\
             }}\n"
        ))
    }
}
