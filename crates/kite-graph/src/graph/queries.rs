//! Query methods for DependencyGraph.

use parking_lot::RwLockReadGuard;

use super::{DependencyGraph, GraphInner};
use crate::ModuleId;

impl DependencyGraph {
    /// Modules that import `id`, sorted. Empty for unknown modules.
    pub fn importers_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.view().importers_of(id)
    }

    /// Modules `id` imports, sorted. Empty for unknown modules.
    pub fn importees_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.view().importees_of(id)
    }

    /// Whether `id` has been recorded as an importer.
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.inner.read().importees.contains_key(id)
    }

    /// Number of recorded importers.
    pub fn len(&self) -> usize {
        self.inner.read().importees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().importees.is_empty()
    }

    /// Total number of import edges.
    pub fn edge_count(&self) -> usize {
        self.inner.read().importees.values().map(|set| set.len()).sum()
    }

    /// Hold a read lock for a multi-step traversal.
    ///
    /// Edges recorded concurrently become visible only after the view is
    /// dropped, so a walk sees one consistent graph.
    pub fn view(&self) -> GraphView<'_> {
        GraphView {
            inner: self.inner.read(),
        }
    }
}

/// Read-locked view over a [`DependencyGraph`].
pub struct GraphView<'a> {
    inner: RwLockReadGuard<'a, GraphInner>,
}

impl GraphView<'_> {
    pub fn importers_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        sorted(self.inner.importers.get(id).map(|set| set.iter()))
    }

    pub fn importees_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        sorted(self.inner.importees.get(id).map(|set| set.iter()))
    }

    /// Whether anything imports `id`.
    pub fn has_importers(&self, id: &ModuleId) -> bool {
        self.inner.importers.contains_key(id)
    }
}

fn sorted<'a>(ids: Option<impl Iterator<Item = &'a ModuleId>>) -> Vec<ModuleId> {
    let mut ids: Vec<ModuleId> = ids.map(|it| it.cloned().collect()).unwrap_or_default();
    ids.sort();
    ids
}
