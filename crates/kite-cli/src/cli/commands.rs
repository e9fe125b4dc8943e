use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available kite subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Serves the project root as native ES modules and pushes hot updates
    /// to connected pages when files change.
    Dev(DevArgs),

    /// Validate configuration
    ///
    /// Loads kite.config.json, KITE_* variables and flags the same way `dev`
    /// does, validates the result and prints it.
    Check(CheckArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug, Default, Clone)]
pub struct DevArgs {
    /// Project root to serve (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Port to listen on
    ///
    /// If the port is taken, the next free one within ten is used.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Host address to bind
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Open the browser once the server is listening
    #[arg(long)]
    pub open: bool,

    /// Path to a config file (defaults to <ROOT>/kite.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for the check command
#[derive(Args, Debug, Default, Clone)]
pub struct CheckArgs {
    /// Project root (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Path to a config file (defaults to <ROOT>/kite.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the resolved configuration as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
