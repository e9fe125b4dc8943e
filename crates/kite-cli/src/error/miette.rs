//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use kite_hmr::HmrError;
use miette::Report;

/// Convert a [`CliError`] into a miette report for the terminal.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::Hmr(e) => hmr_error_to_miette(e),
        CliError::Server(msg) => {
            miette::miette!("Server error: {}\n\nHint: Check that the port is free", msg)
        }
        _ => miette::miette!("{}", err),
    }
}

/// Convert an [`HmrError`] into a miette report.
pub fn hmr_error_to_miette(err: HmrError) -> Report {
    match err {
        HmrError::Parse { id, message } => {
            miette::miette!("Failed to parse {}:\n{}", id, message)
        }
        HmrError::Sfc { id, source } => {
            miette::miette!("Failed to parse component {}: {}", id, source)
        }
        other => miette::miette!("{}", other),
    }
}
