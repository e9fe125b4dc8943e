//! Kite CLI library.
//!
//! The `kite` binary is a thin wrapper over this crate so the server pieces
//! can be driven from integration tests:
//!
//! - [`cli`] - command-line arguments
//! - [`config`] - layered configuration (defaults, file, environment, flags)
//! - [`dev`] - HTTP module server, WebSocket transport and file watcher
//! - [`commands`] - `dev` and `check`

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
