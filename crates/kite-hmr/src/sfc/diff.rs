//! Block comparison and the component update policy.

use indexmap::IndexMap;
use tracing::debug;

use kite_graph::ModuleId;

use super::{SfcBlock, SfcDescriptor};
use crate::payload::HmrUpdate;
use crate::style::style_element_id;

/// Whether two optional blocks are interchangeable.
///
/// Two absent blocks are equal and one absent block is not. Blocks that load
/// the same external `src` are equal regardless of anything else. Otherwise
/// content and attributes must both match.
pub fn blocks_equal(a: Option<&SfcBlock>, b: Option<&SfcBlock>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if let (Some(a_src), Some(b_src)) = (&a.src, &b.src) {
                if a_src == b_src {
                    return true;
                }
            }
            a.content == b.content && attrs_equal(&a.attrs, &b.attrs)
        }
        _ => false,
    }
}

/// Unordered key/value comparison.
fn attrs_equal(a: &IndexMap<String, String>, b: &IndexMap<String, String>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|(key, value)| b.get(key) == Some(value))
}

/// Updates needed to move a page from `prev` to `next` of component `id`.
///
/// A script change (either script block) reloads the component and nothing
/// else is reported. Failing that, a template change re-renders it. Failing
/// that, every new or changed style block is updated and every style block
/// that disappeared is removed.
pub fn diff_descriptors(id: &ModuleId, prev: &SfcDescriptor, next: &SfcDescriptor) -> Vec<HmrUpdate> {
    let path = id.path().to_string();

    if !blocks_equal(prev.script.as_ref(), next.script.as_ref())
        || !blocks_equal(prev.script_setup.as_ref(), next.script_setup.as_ref())
    {
        debug!(module = %id, "script changed");
        return vec![HmrUpdate::VueReload { path }];
    }

    if !blocks_equal(prev.template.as_ref(), next.template.as_ref()) {
        debug!(module = %id, "template changed");
        return vec![HmrUpdate::VueRerender { path }];
    }

    let mut updates = Vec::new();

    for (index, style) in next.styles.iter().enumerate() {
        if !blocks_equal(prev.styles.get(index), Some(style)) {
            updates.push(HmrUpdate::StyleUpdate {
                path: format!("{path}?type=style&index={index}"),
                index,
                id: style_element_id(id, index),
            });
        }
    }

    for index in next.styles.len()..prev.styles.len() {
        updates.push(HmrUpdate::StyleRemove {
            path: format!("{path}?type=style&index={index}"),
            index,
            id: style_element_id(id, index),
        });
    }

    debug!(module = %id, count = updates.len(), "style blocks compared");
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sfc::parse_sfc;

    fn block(content: &str, attrs: &[(&str, &str)]) -> SfcBlock {
        SfcBlock {
            content: content.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            src: attrs
                .iter()
                .find(|(k, _)| *k == "src")
                .map(|(_, v)| v.to_string()),
        }
    }

    fn id() -> ModuleId {
        ModuleId::new("/App.vue").unwrap()
    }

    #[test]
    fn absent_blocks() {
        let a = block("x", &[]);
        assert!(blocks_equal(None, None));
        assert!(!blocks_equal(Some(&a), None));
        assert!(!blocks_equal(None, Some(&a)));
    }

    #[test]
    fn same_src_is_equal_whatever_else_differs() {
        let a = block("", &[("src", "./a.css")]);
        let b = block("stale", &[("src", "./a.css"), ("scoped", "")]);
        assert!(blocks_equal(Some(&a), Some(&b)));

        let c = block("", &[("src", "./b.css")]);
        assert!(!blocks_equal(Some(&a), Some(&c)));
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let a = block("x", &[("lang", "ts"), ("setup", "")]);
        let b = block("x", &[("setup", ""), ("lang", "ts")]);
        assert!(blocks_equal(Some(&a), Some(&b)));
    }

    #[test]
    fn attribute_values_and_counts_matter() {
        let a = block("x", &[("lang", "ts")]);
        assert!(!blocks_equal(Some(&a), Some(&block("x", &[("lang", "js")]))));
        assert!(!blocks_equal(Some(&a), Some(&block("x", &[]))));
        assert!(!blocks_equal(Some(&a), Some(&block("y", &[("lang", "ts")]))));
    }

    #[test]
    fn setup_script_change_reloads() {
        let prev = parse_sfc("<script setup>const a = 1</script><template>x</template>").unwrap();
        let next = parse_sfc("<script setup>const a = 2</script><template>y</template>").unwrap();
        assert_eq!(
            diff_descriptors(&id(), &prev, &next),
            vec![HmrUpdate::VueReload { path: "/App.vue".into() }]
        );
    }

    #[test]
    fn removed_middle_style_updates_shifted_indices() {
        let prev = parse_sfc("<style>.a{}</style><style>.b{}</style><style>.c{}</style>").unwrap();
        let next = parse_sfc("<style>.a{}</style><style>.c{}</style>").unwrap();
        let updates = diff_descriptors(&id(), &prev, &next);
        assert_eq!(updates.len(), 2);
        assert!(matches!(updates[0], HmrUpdate::StyleUpdate { index: 1, .. }));
        assert!(matches!(updates[1], HmrUpdate::StyleRemove { index: 2, .. }));
    }

    #[test]
    fn added_style_is_an_update() {
        let prev = parse_sfc("<template>x</template>").unwrap();
        let next = parse_sfc("<template>x</template><style>.a{}</style>").unwrap();
        assert_eq!(
            diff_descriptors(&id(), &prev, &next),
            vec![HmrUpdate::StyleUpdate {
                path: "/App.vue?type=style&index=0".into(),
                index: 0,
                id: style_element_id(&id(), 0),
            }]
        );
    }
}
