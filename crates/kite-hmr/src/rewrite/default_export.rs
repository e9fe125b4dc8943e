//! Default-export capture for component scripts.

use oxc_allocator::Allocator;
use oxc_ast::ast::ModuleDeclaration;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};

use kite_graph::ModuleId;

use crate::error::{HmrError, Result};

/// Bind a module's default export to a local `const`.
///
/// `export default { name: "App" }` becomes `const __script = { name: "App" }`.
/// A module without a default export gets `const __script = {}` appended, so
/// the caller can always decorate and re-export the binding.
pub fn rewrite_default_export(
    id: &ModuleId,
    source: &str,
    source_type: SourceType,
    binding: &str,
) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(HmrError::Parse {
            id: id.clone(),
            message: super::join_errors(&ret.errors),
        });
    }

    let replaced = ret.program.body.iter().find_map(|stmt| {
        match stmt.as_module_declaration()? {
            ModuleDeclaration::ExportDefaultDeclaration(decl) => {
                let start = decl.span.start as usize;
                let value_start = decl.declaration.span().start as usize;
                Some((start, value_start))
            }
            _ => None,
        }
    });

    let code = match replaced {
        Some((start, value_start)) => {
            format!("{}const {binding} = {}", &source[..start], &source[value_start..])
        }
        None => format!("{source}\nconst {binding} = {{}}"),
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ModuleId {
        ModuleId::new("/App.vue").unwrap()
    }

    #[test]
    fn binds_object_default_export() {
        let code = rewrite_default_export(
            &id(),
            "import { ref } from 'vue'\nexport default { name: 'App' }\n",
            SourceType::mjs(),
            "__script",
        )
        .unwrap();
        assert_eq!(
            code,
            "import { ref } from 'vue'\nconst __script = { name: 'App' }\n"
        );
    }

    #[test]
    fn binds_call_default_export() {
        let code = rewrite_default_export(
            &id(),
            "export default defineComponent({ setup() {} })",
            SourceType::mjs(),
            "__script",
        )
        .unwrap();
        assert_eq!(code, "const __script = defineComponent({ setup() {} })");
    }

    #[test]
    fn appends_empty_binding_without_default_export() {
        let code =
            rewrite_default_export(&id(), "export const a = 1", SourceType::mjs(), "__script")
                .unwrap();
        assert_eq!(code, "export const a = 1\nconst __script = {}");
    }

    #[test]
    fn ignores_default_text_in_strings() {
        let code = rewrite_default_export(
            &id(),
            "const s = 'export default 1'\nexport default s",
            SourceType::mjs(),
            "__script",
        )
        .unwrap();
        assert_eq!(code, "const s = 'export default 1'\nconst __script = s");
    }

    #[test]
    fn surfaces_parse_errors() {
        let err = rewrite_default_export(&id(), "export default {", SourceType::mjs(), "__script")
            .unwrap_err();
        assert!(matches!(err, HmrError::Parse { .. }));
    }
}
