//! Mutation methods for DependencyGraph.

use rustc_hash::FxHashSet as HashSet;
use tracing::trace;

use super::{DependencyGraph, EdgeDelta, GraphInner};
use crate::ModuleId;

impl DependencyGraph {
    /// Replace the full set of modules `importer` imports.
    ///
    /// Called each time a module is transformed. Stale importer entries are
    /// pruned from every module `importer` stopped importing, and `importer`
    /// is added to the importer set of every module it imports now. Importing
    /// the same specifier twice records one edge.
    pub fn record_edges<I>(&self, importer: &ModuleId, importees: I) -> EdgeDelta
    where
        I: IntoIterator<Item = ModuleId>,
    {
        let next: HashSet<ModuleId> = importees.into_iter().collect();

        let mut inner = self.inner.write();
        let previous = inner.importees.remove(importer).unwrap_or_default();

        let mut removed: Vec<ModuleId> = previous.difference(&next).cloned().collect();
        let mut added: Vec<ModuleId> = next.difference(&previous).cloned().collect();

        for stale in &removed {
            inner.unlink(importer, stale);
        }
        for dep in &added {
            inner
                .importers
                .entry(dep.clone())
                .or_default()
                .insert(importer.clone());
        }
        inner.importees.insert(importer.clone(), next);
        drop(inner);

        removed.sort();
        added.sort();

        trace!(
            importer = %importer,
            added = added.len(),
            removed = removed.len(),
            "recorded import edges"
        );

        EdgeDelta { added, removed }
    }

    /// Forget a module that no longer exists on disk.
    ///
    /// Its outgoing edges are dropped. Incoming edges stay: modules that still
    /// import it are unchanged until they are transformed again, and the
    /// invalidation walk needs to reach them.
    pub fn remove_module(&self, id: &ModuleId) -> bool {
        let mut inner = self.inner.write();
        let Some(previous) = inner.importees.remove(id) else {
            return false;
        };
        for dep in &previous {
            inner.unlink(id, dep);
        }
        true
    }

    /// Drop every recorded edge.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.importees.clear();
        inner.importers.clear();
    }
}

impl GraphInner {
    /// Remove `importer` from the importer set of `dep`, dropping empty sets.
    fn unlink(&mut self, importer: &ModuleId, dep: &ModuleId) {
        if let Some(set) = self.importers.get_mut(dep) {
            set.remove(importer);
            if set.is_empty() {
                self.importers.remove(dep);
            }
        }
    }
}
