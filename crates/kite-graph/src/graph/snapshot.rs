//! Point-in-time copies of the graph for diagnostics and tests.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::Serialize;

use super::DependencyGraph;
use crate::ModuleId;

/// Ordered copy of both edge maps, taken under one read lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub importees: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
    pub importers: BTreeMap<ModuleId, BTreeSet<ModuleId>>,
}

impl GraphSnapshot {
    /// Whether `importers` is exactly the transpose of `importees`.
    pub fn is_transpose_consistent(&self) -> bool {
        let mut expected: BTreeMap<ModuleId, BTreeSet<ModuleId>> = BTreeMap::new();
        for (importer, deps) in &self.importees {
            for dep in deps {
                expected
                    .entry(dep.clone())
                    .or_default()
                    .insert(importer.clone());
            }
        }
        expected == self.importers
    }
}

impl DependencyGraph {
    pub fn snapshot(&self) -> GraphSnapshot {
        let inner = self.inner.read();
        GraphSnapshot {
            importees: ordered(&inner.importees),
            importers: ordered(&inner.importers),
        }
    }
}

fn ordered(map: &HashMap<ModuleId, HashSet<ModuleId>>) -> BTreeMap<ModuleId, BTreeSet<ModuleId>> {
    map.iter()
        .map(|(id, set)| (id.clone(), set.iter().cloned().collect()))
        .collect()
}
