//! File change invalidation.
//!
//! A change to a component is classified by diffing its previous and new
//! block structure. A change to any other module is pushed upward through
//! its importers until every path ends at a component, which can be swapped
//! in place, or at a module nothing imports, which cannot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use tracing::{debug, info};

use kite_graph::{DependencyGraph, GraphView, ModuleId};

use crate::error::{HmrError, Result};
use crate::payload::{HmrPayload, HmrUpdate};
use crate::sfc::{diff_descriptors, parse_sfc, DescriptorCache};

/// A debounced filesystem change, already mapped to a module id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Created(ModuleId),
    Modified(ModuleId),
    Removed(ModuleId),
}

impl FileChange {
    pub fn id(&self) -> &ModuleId {
        match self {
            FileChange::Created(id) | FileChange::Modified(id) | FileChange::Removed(id) => id,
        }
    }
}

/// Supplies current file contents to the engine.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    async fn load(&self, id: &ModuleId) -> Result<String>;
}

/// Loads sources from a project root on disk.
#[derive(Debug, Clone)]
pub struct FsSourceLoader {
    root: PathBuf,
}

impl FsSourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of the file that owns `id`.
    pub fn path_for(&self, id: &ModuleId) -> PathBuf {
        self.root.join(id.path().trim_start_matches('/'))
    }
}

#[async_trait]
impl SourceLoader for FsSourceLoader {
    async fn load(&self, id: &ModuleId) -> Result<String> {
        let path = self.path_for(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(HmrError::NotFound(path)),
            Err(err) => Err(HmrError::Io(err)),
        }
    }
}

/// Outcome of the upward importer walk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Walk {
    /// Every path reached a component.
    Boundaries(IndexSet<ModuleId>),
    /// Some path reached a module with no importers.
    DeadEnd(ModuleId),
}

/// Decides what a file change means for connected pages.
///
/// Holds handles to the graph and descriptor cache shared with the request
/// handlers; it never mutates the graph except to forget deleted files.
#[derive(Clone)]
pub struct InvalidationEngine {
    graph: DependencyGraph,
    descriptors: DescriptorCache,
    loader: Arc<dyn SourceLoader>,
}

impl InvalidationEngine {
    pub fn new(
        graph: DependencyGraph,
        descriptors: DescriptorCache,
        loader: Arc<dyn SourceLoader>,
    ) -> Self {
        Self {
            graph,
            descriptors,
            loader,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    /// Turn one change into the message to broadcast, if any.
    pub async fn handle_change(&self, change: &FileChange) -> Result<Option<HmrPayload>> {
        let id = change.id().owner();

        let payload = if let FileChange::Removed(_) = change {
            self.forget(&id);
            self.propagate(&id)
        } else if is_page(&id) {
            Some(HmrPayload::full_reload(id.path()))
        } else if id.is_structured() {
            self.handle_structured(&id).await?
        } else {
            self.propagate(&id)
        };

        match &payload {
            Some(payload) => info!(
                module = %id,
                updates = ?payload.updates().iter().map(HmrUpdate::kind).collect::<Vec<_>>(),
                "hot update"
            ),
            None => debug!(module = %id, "change needs no update"),
        }

        Ok(payload)
    }

    /// Reparse a component and diff it against its previous parse.
    async fn handle_structured(&self, id: &ModuleId) -> Result<Option<HmrPayload>> {
        let previous = self.descriptors.invalidate(id);

        let source = self.loader.load(id).await?;
        let next = parse_sfc(&source).map_err(|source| HmrError::Sfc {
            id: id.clone(),
            source,
        })?;
        let next = self.descriptors.insert(id.clone(), next);

        let Some(previous) = previous else {
            debug!(module = %id, "component was never served, nothing to compare");
            return Ok(None);
        };

        Ok(HmrPayload::from_updates(diff_descriptors(id, &previous, &next)))
    }

    /// Update for a changed plain module, found by walking its importers.
    fn propagate(&self, id: &ModuleId) -> Option<HmrPayload> {
        let view = self.graph.view();
        if !view.has_importers(id) {
            debug!(module = %id, "no importers");
            return None;
        }

        match walk_to_boundaries(&view, id) {
            Walk::Boundaries(boundaries) if !boundaries.is_empty() => {
                let updates = boundaries
                    .into_iter()
                    .map(|boundary| HmrUpdate::VueReload {
                        path: boundary.path().to_string(),
                    })
                    .collect();
                Some(HmrPayload::batch(updates))
            }
            Walk::Boundaries(_) => {
                debug!(module = %id, "importers only form cycles, reloading page");
                Some(HmrPayload::full_reload(id.path()))
            }
            Walk::DeadEnd(at) => {
                debug!(module = %id, dead_end = %at, "no hot boundary");
                Some(HmrPayload::full_reload(id.path()))
            }
        }
    }

    /// Drop everything known about a deleted file.
    fn forget(&self, id: &ModuleId) {
        if let Some(previous) = self.descriptors.invalidate(id) {
            let mut derived = Vec::with_capacity(previous.styles.len() + 1);
            derived.push(format!("{}?type=template", id.path()));
            derived.extend((0..previous.styles.len()).map(|index| {
                format!("{}?type=style&index={index}", id.path())
            }));
            for raw in derived {
                if let Ok(derived) = ModuleId::new(raw) {
                    self.graph.remove_module(&derived);
                }
            }
        }
        self.graph.remove_module(id);
    }
}

/// Depth-first walk over importers with a visited set per path.
///
/// A node may be reached along several paths and each one must end at a
/// boundary, so visited state is scoped to the path, not the walk.
fn walk_to_boundaries(view: &GraphView<'_>, start: &ModuleId) -> Walk {
    let mut boundaries = IndexSet::new();
    let mut stack: Vec<(ModuleId, Vec<ModuleId>)> = vec![(start.clone(), vec![start.clone()])];

    while let Some((node, path)) = stack.pop() {
        let mut pending = Vec::new();

        for importer in view.importers_of(&node) {
            if path.contains(&importer) {
                continue;
            }

            if importer.is_structured() {
                debug!(boundary = %importer, via = %node, "reached component");
                boundaries.insert(importer.owner());
                continue;
            }

            if !view.has_importers(&importer) {
                return Walk::DeadEnd(importer);
            }

            let mut next_path = path.clone();
            next_path.push(importer.clone());
            pending.push((importer, next_path));
        }

        // First importer is explored first.
        stack.extend(pending.into_iter().rev());
    }

    Walk::Boundaries(boundaries)
}

/// HTML pages are entry documents, not modules.
fn is_page(id: &ModuleId) -> bool {
    matches!(id.extension(), Some("html" | "htm"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ModuleId {
        ModuleId::new(raw).unwrap()
    }

    #[test]
    fn walk_collects_boundaries_in_discovery_order() {
        let graph = DependencyGraph::new();
        graph.record_edges(&id("/B.vue"), [id("/leaf.js")]);
        graph.record_edges(&id("/A.vue"), [id("/leaf.js")]);

        let walk = walk_to_boundaries(&graph.view(), &id("/leaf.js"));
        let Walk::Boundaries(boundaries) = walk else {
            panic!("expected boundaries");
        };
        assert_eq!(
            boundaries.into_iter().collect::<Vec<_>>(),
            vec![id("/A.vue"), id("/B.vue")]
        );
    }

    #[test]
    fn derived_importer_maps_to_its_owner() {
        let graph = DependencyGraph::new();
        graph.record_edges(&id("/App.vue?type=template"), [id("/helpers.js")]);

        let walk = walk_to_boundaries(&graph.view(), &id("/helpers.js"));
        assert_eq!(walk, Walk::Boundaries(IndexSet::from([id("/App.vue")])));
    }

    #[test]
    fn cycle_back_to_start_is_skipped() {
        let graph = DependencyGraph::new();
        graph.record_edges(&id("/a.js"), [id("/b.js")]);
        graph.record_edges(&id("/b.js"), [id("/a.js")]);
        graph.record_edges(&id("/Comp.vue"), [id("/b.js")]);

        let walk = walk_to_boundaries(&graph.view(), &id("/a.js"));
        assert_eq!(walk, Walk::Boundaries(IndexSet::from([id("/Comp.vue")])));
    }

    #[test]
    fn pages_are_not_modules() {
        assert!(is_page(&id("/index.html")));
        assert!(!is_page(&id("/main.js")));
    }
}
