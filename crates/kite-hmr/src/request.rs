//! Request URL parsing.
//!
//! A browser request carries the module path plus a query that mixes identity
//! (`type`, `index`) with transport markers (`import`, `t`). The markers steer
//! how a response is built but never reach the [`ModuleId`].

use kite_graph::ModuleId;

use crate::error::{HmrError, Result};

/// Which part of a file a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// The file itself (for a component, its stitched main module).
    Main,
    /// A component's compiled template.
    Template,
    /// A component's style block at the given index.
    Style(usize),
}

/// A parsed module request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    pub id: ModuleId,
    pub kind: RequestKind,
    /// Cache-busting token (`t=`), if the request carried one.
    pub timestamp: Option<String>,
    /// Whether the request came from an `import` statement (`?import`).
    pub is_import: bool,
}

impl ModuleRequest {
    /// Parse a request path with an optional query.
    pub fn parse(url: &str) -> Result<Self> {
        let id = ModuleId::new(url)?;
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");

        let mut timestamp = None;
        let mut is_import = false;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some(("t", value)) if !value.is_empty() => timestamp = Some(value.to_string()),
                None if pair == "import" => is_import = true,
                Some(("import", _)) => is_import = true,
                _ => {}
            }
        }

        Ok(Self {
            timestamp,
            is_import,
            ..Self::for_id(id)?
        })
    }

    /// A request for `id` with no transport markers.
    ///
    /// A style request must name its block by a numeric `index`; anything else
    /// addresses no block at all.
    pub fn for_id(id: ModuleId) -> Result<Self> {
        let kind = match id.query_value("type") {
            Some("template") => RequestKind::Template,
            Some("style") => {
                let index = id.query_value("index");
                match index.and_then(|index| index.parse().ok()) {
                    Some(index) => RequestKind::Style(index),
                    None => {
                        return Err(HmrError::MissingBlock {
                            id: id.owner(),
                            block: format!("style #{}", index.unwrap_or("")),
                        })
                    }
                }
            }
            _ => RequestKind::Main,
        };
        Ok(Self {
            id,
            kind,
            timestamp: None,
            is_import: false,
        })
    }

    /// `&t=<token>` when the request carried a token, else empty.
    pub fn timestamp_suffix(&self) -> String {
        match &self.timestamp {
            Some(t) => format!("&t={t}"),
            None => String::new(),
        }
    }
}
