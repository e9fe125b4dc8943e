//! Style blocks served as JavaScript modules.

use kite_graph::ModuleId;

/// Deterministic DOM id for style block `index` of the component `owner`.
///
/// Both the style module and a later `style-remove` message derive the id
/// from the owning file, so the client can find the element either way.
pub fn style_element_id(owner: &ModuleId, index: usize) -> String {
    let hash = seahash::hash(owner.path().as_bytes());
    format!("kite-style-{hash:x}-{index}")
}

/// DOM id for a plain stylesheet imported from script.
pub fn css_element_id(id: &ModuleId) -> String {
    let hash = seahash::hash(id.path().as_bytes());
    format!("kite-css-{hash:x}")
}

/// Module that inserts `css` into the page, replacing an element with the same id.
pub fn css_to_module(css: &str, element_id: &str) -> String {
    let css = serde_json::Value::from(css);
    let element_id = serde_json::Value::from(element_id);
    format!(
        "const id = {element_id};\n\
         const css = {css};\n\
         let style = document.getElementById(id);\n\
         if (!style) {{\n\
         \x20 style = document.createElement(\"style\");\n\
         \x20 style.setAttribute(\"type\", \"text/css\");\n\
         \x20 style.id = id;\n\
         \x20 document.head.appendChild(style);\n\
         }}\n\
         style.textContent = css;\n\
         export default css;\n"
    )
}
