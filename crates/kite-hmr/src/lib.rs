//! Hot module replacement core for the kite dev server.
//!
//! This crate is transport-agnostic. It turns served sources into browser
//! modules while recording their import edges, keeps the last parse of every
//! single-file component, and turns file changes into update instructions:
//!
//! - [`rewrite::ImportRewriter`] rewrites import specifiers and feeds the graph.
//! - [`sfc::DescriptorCache`] and [`sfc::diff_descriptors`] compare component parses.
//! - [`engine::InvalidationEngine`] decides what a change means for the page.
//! - [`transport::ConnectionSet`] fans instructions out to connected clients.

pub mod compiler;
pub mod engine;
pub mod error;
pub mod payload;
pub mod request;
pub mod rewrite;
pub mod sfc;
pub mod style;
pub mod transport;

pub use kite_graph::{DependencyGraph, EdgeDelta, ModuleId, ModuleIdError};

pub use compiler::{StaticTemplateCompiler, TemplateCompiler};
pub use engine::{FileChange, FsSourceLoader, InvalidationEngine, SourceLoader};
pub use error::{HmrError, Result};
pub use payload::{HmrPayload, HmrUpdate};
pub use request::{ModuleRequest, RequestKind};
pub use rewrite::{rewrite_default_export, ImportRewriter, RewriteOutput, RewrittenImport};
pub use sfc::{blocks_equal, diff_descriptors, parse_sfc, DescriptorCache, SfcBlock, SfcDescriptor};
pub use transport::{BroadcastReport, ClientId, ConnectionSet};

/// WebSocket sub-protocol token clients must offer.
pub const HMR_PROTOCOL: &str = "kite-hmr";
