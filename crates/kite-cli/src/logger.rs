//! Logging setup for the kite binary.
//!
//! Library crates only emit `tracing` events; this module installs the
//! subscriber that renders them.
//!
//! # Verbosity
//!
//! 1. `--verbose`: DEBUG for the kite crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`: custom filter
//! 4. Default: INFO for the kite crates

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "kite=debug,kite_cli=debug,kite_hmr=debug,kite_graph=debug";
const QUIET_FILTER: &str = "kite=error,kite_cli=error,kite_hmr=error,kite_graph=error";
const DEFAULT_FILTER: &str = "kite=info,kite_cli=info,kite_hmr=info,kite_graph=info";

/// Initialize the tracing subscriber from the global flags.
///
/// Must be called once, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Pick the filter for the given verbosity flags. `verbose` wins over `quiet`.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
