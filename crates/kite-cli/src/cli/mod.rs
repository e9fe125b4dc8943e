//! Command-line interface definition.
//!
//! - `kite dev` - serve a project with hot module replacement
//! - `kite check` - resolve and validate the configuration

mod commands;

use clap::Parser;

pub use commands::{CheckArgs, Command, DevArgs};

/// Kite - native-ESM dev server with hot module replacement
#[derive(Parser, Debug)]
#[command(
    name = "kite",
    version,
    about = "A native-ESM dev server with hot module replacement",
    long_about = "Kite serves your source files to the browser as ES modules, rewriting\n\
                  imports on the fly, and pushes hot updates over a WebSocket when files change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
