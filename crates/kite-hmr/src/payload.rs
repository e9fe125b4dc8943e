//! Update instructions and their JSON wire format.
//!
//! Every message on the HMR socket is a JSON object with a `type` tag:
//!
//! ```json
//! {"type":"connected"}
//! {"type":"vue-rerender","path":"/App.vue"}
//! {"type":"multi","updates":[{"type":"style-update","path":"/App.vue?type=style&index=0","index":0,"id":"kite-style-1f2e-0"}]}
//! ```
//!
//! A batch only holds plain updates, so batches never nest.

use serde::{Deserialize, Serialize};

/// A single, non-batch update instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrUpdate {
    /// Reload the whole page.
    FullReload { path: String },
    /// Re-import the component and swap its definition.
    VueReload { path: String },
    /// Re-import the compiled template and swap the render function.
    VueRerender { path: String },
    /// Re-import a style block module, replacing the element with `id`.
    StyleUpdate {
        path: String,
        index: usize,
        id: String,
    },
    /// Remove the style element with `id`.
    StyleRemove {
        path: String,
        index: usize,
        id: String,
    },
}

impl HmrUpdate {
    pub fn path(&self) -> &str {
        match self {
            HmrUpdate::FullReload { path }
            | HmrUpdate::VueReload { path }
            | HmrUpdate::VueRerender { path }
            | HmrUpdate::StyleUpdate { path, .. }
            | HmrUpdate::StyleRemove { path, .. } => path,
        }
    }

    /// The wire tag of this update.
    pub fn kind(&self) -> &'static str {
        match self {
            HmrUpdate::FullReload { .. } => "full-reload",
            HmrUpdate::VueReload { .. } => "vue-reload",
            HmrUpdate::VueRerender { .. } => "vue-rerender",
            HmrUpdate::StyleUpdate { .. } => "style-update",
            HmrUpdate::StyleRemove { .. } => "style-remove",
        }
    }
}

/// A message sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMessage", into = "WireMessage")]
pub enum HmrPayload {
    /// Greeting sent once when a client connects.
    Connected,
    Update(HmrUpdate),
    /// Ordered batch produced by one invalidation event.
    Multi(Vec<HmrUpdate>),
}

impl HmrPayload {
    /// Nothing for no updates, a bare update for one, a batch otherwise.
    pub fn from_updates(mut updates: Vec<HmrUpdate>) -> Option<Self> {
        match updates.len() {
            0 => None,
            1 => updates.pop().map(HmrPayload::Update),
            _ => Some(HmrPayload::Multi(updates)),
        }
    }

    /// Always a batch, even for a single update.
    pub fn batch(updates: Vec<HmrUpdate>) -> Self {
        HmrPayload::Multi(updates)
    }

    pub fn full_reload(path: impl Into<String>) -> Self {
        HmrPayload::Update(HmrUpdate::FullReload { path: path.into() })
    }

    /// The updates carried by this message, in order.
    pub fn updates(&self) -> &[HmrUpdate] {
        match self {
            HmrPayload::Connected => &[],
            HmrPayload::Update(update) => std::slice::from_ref(update),
            HmrPayload::Multi(updates) => updates,
        }
    }

    pub fn is_full_reload(&self) -> bool {
        matches!(self, HmrPayload::Update(HmrUpdate::FullReload { .. }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireMessage {
    Update(HmrUpdate),
    Control(ControlMessage),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ControlMessage {
    Connected,
    Multi { updates: Vec<HmrUpdate> },
}

impl From<WireMessage> for HmrPayload {
    fn from(message: WireMessage) -> Self {
        match message {
            WireMessage::Update(update) => HmrPayload::Update(update),
            WireMessage::Control(ControlMessage::Connected) => HmrPayload::Connected,
            WireMessage::Control(ControlMessage::Multi { updates }) => HmrPayload::Multi(updates),
        }
    }
}

impl From<HmrPayload> for WireMessage {
    fn from(payload: HmrPayload) -> Self {
        match payload {
            HmrPayload::Connected => WireMessage::Control(ControlMessage::Connected),
            HmrPayload::Update(update) => WireMessage::Update(update),
            HmrPayload::Multi(updates) => WireMessage::Control(ControlMessage::Multi { updates }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rerender() -> HmrUpdate {
        HmrUpdate::VueRerender {
            path: "/App.vue".into(),
        }
    }

    #[test]
    fn serializes_tagged_objects() {
        let json = serde_json::to_value(HmrPayload::Connected).unwrap();
        assert_eq!(json, json!({ "type": "connected" }));

        let json = serde_json::to_value(HmrPayload::Update(rerender())).unwrap();
        assert_eq!(json, json!({ "type": "vue-rerender", "path": "/App.vue" }));

        let removal = HmrUpdate::StyleRemove {
            path: "/App.vue?type=style&index=2".into(),
            index: 2,
            id: "kite-style-ab-2".into(),
        };
        let json = serde_json::to_value(HmrPayload::batch(vec![removal])).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "multi",
                "updates": [{
                    "type": "style-remove",
                    "path": "/App.vue?type=style&index=2",
                    "index": 2,
                    "id": "kite-style-ab-2"
                }]
            })
        );
    }

    #[test]
    fn parses_known_messages() {
        let payload = HmrPayload::from_json(r#"{"type":"full-reload","path":"/main.js"}"#).unwrap();
        assert!(payload.is_full_reload());

        let payload = HmrPayload::from_json(
            r#"{"type":"multi","updates":[{"type":"vue-reload","path":"/A.vue"}]}"#,
        )
        .unwrap();
        assert_eq!(payload.updates().len(), 1);
        assert_eq!(payload.updates()[0].kind(), "vue-reload");
    }

    #[test]
    fn rejects_unknown_and_nested_messages() {
        assert!(HmrPayload::from_json(r#"{"type":"explode"}"#).is_err());
        assert!(HmrPayload::from_json(r#"{"type":"vue-reload"}"#).is_err());
        assert!(HmrPayload::from_json(
            r#"{"type":"multi","updates":[{"type":"multi","updates":[]}]}"#
        )
        .is_err());
    }

    #[test]
    fn wraps_by_count() {
        assert_eq!(HmrPayload::from_updates(vec![]), None);
        assert_eq!(
            HmrPayload::from_updates(vec![rerender()]),
            Some(HmrPayload::Update(rerender()))
        );
        assert_eq!(
            HmrPayload::from_updates(vec![rerender(), rerender()]),
            Some(HmrPayload::Multi(vec![rerender(), rerender()]))
        );
        assert!(HmrPayload::Connected.updates().is_empty());
    }
}
