//! Shared state for the development server.
//!
//! One service object owns the dependency graph, the component descriptor
//! cache and the client connections for the lifetime of the server. Request
//! handlers and the watcher loop share it through [`SharedState`].

use crate::dev::{DependencyRegistry, DevConfig};
use kite_hmr::{
    BroadcastReport, ConnectionSet, DependencyGraph, DescriptorCache, FileChange, FsSourceLoader,
    ImportRewriter, InvalidationEngine, SourceLoader, StaticTemplateCompiler, TemplateCompiler,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state handle for axum handlers.
pub type SharedState = Arc<DevServerState>;

pub struct DevServerState {
    pub config: DevConfig,
    pub graph: DependencyGraph,
    pub descriptors: DescriptorCache,
    pub rewriter: ImportRewriter,
    pub engine: InvalidationEngine,
    pub connections: ConnectionSet,
    pub loader: Arc<dyn SourceLoader>,
    pub compiler: Arc<dyn TemplateCompiler>,
    pub deps: DependencyRegistry,
}

impl DevServerState {
    /// State reading sources from the configured root.
    pub fn new(config: DevConfig) -> Self {
        let loader = Arc::new(FsSourceLoader::new(config.root.clone()));
        Self::with_parts(config, loader, Arc::new(StaticTemplateCompiler))
    }

    /// State with an explicit source loader and template compiler.
    pub fn with_parts(
        config: DevConfig,
        loader: Arc<dyn SourceLoader>,
        compiler: Arc<dyn TemplateCompiler>,
    ) -> Self {
        let graph = DependencyGraph::new();
        let descriptors = DescriptorCache::new();

        Self {
            rewriter: ImportRewriter::new(graph.clone(), config.bare_module_route.clone()),
            engine: InvalidationEngine::new(graph.clone(), descriptors.clone(), loader.clone()),
            deps: DependencyRegistry::new(config.root.clone()),
            connections: ConnectionSet::new(),
            config,
            graph,
            descriptors,
            loader,
            compiler,
        }
    }

    /// Run a debounced change through the engine and broadcast the result.
    ///
    /// Returns the broadcast report when an update was sent.
    pub async fn apply_change(&self, change: &FileChange) -> Option<BroadcastReport> {
        let payload = match self.engine.handle_change(change).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(module = %change.id(), "change needs no update");
                return None;
            }
            Err(err) => {
                warn!(module = %change.id(), error = %err, "failed to process change");
                crate::ui::error(&format!("{}", err));
                return None;
            }
        };

        let report = self.connections.broadcast(&payload);
        info!(
            module = %change.id(),
            updates = payload.updates().len(),
            delivered = report.delivered,
            skipped = report.skipped,
            closed = report.closed,
            "broadcast update"
        );
        Some(report)
    }

    /// Drop graph and descriptor state at shutdown.
    pub fn teardown(&self) {
        self.graph.clear();
        self.descriptors.clear();
        debug!("dev server state torn down");
    }
}
