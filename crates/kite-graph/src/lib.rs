//! Module identity and the bidirectional import graph behind hot updates.
//!
//! The dev server records, for every module it serves, the set of modules that
//! module imports. [`DependencyGraph`] keeps that forward relation together with
//! its transpose so the invalidation engine can walk from a changed file up to
//! its importers without scanning.
//!
//! Every lookup is keyed by [`ModuleId`], the single normalized identity shared
//! by the import rewriter and the file watcher.

mod graph;
mod module_id;

#[cfg(test)]
mod tests;

pub use graph::{DependencyGraph, EdgeDelta, GraphSnapshot, GraphView};
pub use module_id::{ModuleId, ModuleIdError};
