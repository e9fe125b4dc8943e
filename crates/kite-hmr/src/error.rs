//! Error types for the HMR core.

use std::path::PathBuf;

use kite_graph::{ModuleId, ModuleIdError};

use crate::sfc::SfcParseError;

/// Result type alias for HMR operations.
pub type Result<T> = std::result::Result<T, HmrError>;

/// Failures surfaced by the HMR core.
///
/// A module missing from the graph is not an error: lookups return empty
/// sets and the invalidation policy treats that as "nothing observes it".
#[derive(Debug, thiserror::Error)]
pub enum HmrError {
    /// The requested file does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Script source could not be parsed for import discovery.
    #[error("Failed to parse {id}: {message}")]
    Parse { id: ModuleId, message: String },

    /// A single-file component could not be split into blocks.
    #[error("Failed to parse component {id}: {source}")]
    Sfc {
        id: ModuleId,
        #[source]
        source: SfcParseError,
    },

    /// A sub-resource that the component does not have.
    #[error("{id} has no {block} block")]
    MissingBlock { id: ModuleId, block: String },

    #[error("Invalid module id: {0}")]
    ModuleId(#[from] ModuleIdError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HmrError {
    /// Whether this error should be reported to the browser as a 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            HmrError::NotFound(_) | HmrError::MissingBlock { .. } => true,
            HmrError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
