//! Development server.
//!
//! - [`server`]: axum router, module fallback and the HMR WebSocket
//! - [`transform`]: request to response body, feeding the import graph
//! - [`deps`]: bare-import registry
//! - [`watcher`]: notify watcher with per-file debouncing
//! - [`state`]: the shared graph, caches and connections

pub mod config;
pub mod deps;
pub mod server;
pub mod state;
pub mod transform;
pub mod watcher;

pub use config::DevConfig;
pub use deps::{DependencyRegistry, ResolvedDependency};
pub use server::DevServer;
pub use state::{DevServerState, SharedState};
pub use transform::{Served, ServedModule, CLIENT_ROUTE};
pub use watcher::{Debouncer, FileWatcher};
