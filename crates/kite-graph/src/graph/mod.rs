//! Bidirectional import graph.
//!
//! `importees` is the forward relation (module to what it imports) and
//! `importers` is its transpose. Both maps are only ever written together,
//! under one write lock, so readers never observe one without the other.

mod mutations;
mod queries;
mod snapshot;

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::ModuleId;

pub use queries::GraphView;
pub use snapshot::GraphSnapshot;

/// Shared, thread-safe import graph.
///
/// Cloning is cheap and every clone observes the same graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(super) inner: Arc<RwLock<GraphInner>>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GraphInner {
    /// Forward edges: module -> modules it imports.
    ///
    /// Modules that have been recorded keep an entry even when they import
    /// nothing, so `contains` can tell "served, no imports" from "unknown".
    pub importees: HashMap<ModuleId, HashSet<ModuleId>>,
    /// Reverse edges: module -> modules that import it. Never holds empty sets.
    pub importers: HashMap<ModuleId, HashSet<ModuleId>>,
}

/// Edges changed by a single `record_edges` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDelta {
    /// Importees that were not recorded before, sorted.
    pub added: Vec<ModuleId>,
    /// Importees that the module no longer imports, sorted.
    pub removed: Vec<ModuleId>,
}

impl EdgeDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }
}
