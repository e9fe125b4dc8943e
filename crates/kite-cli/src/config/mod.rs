//! Configuration with multi-source loading.
//!
//! Merges settings from CLI args, environment variables and `kite.config.json`.
//! Priority: CLI > Environment > File > Defaults

mod defaults;
mod loading;
mod validation;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::*;
pub use loading::{ConfigOverrides, CONFIG_FILE_NAME};
pub use validation::validate_route;

/// Kite configuration - loaded from kite.config.json, `KITE_*` variables and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KiteConfig {
    /// Project root to serve
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Host address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route of the HMR WebSocket endpoint
    #[serde(default = "default_hmr_path")]
    pub hmr_path: String,

    /// Route prefix bare imports are rewritten to (`/@module/vue`)
    #[serde(default = "default_bare_module_route")]
    pub bare_module_route: String,

    /// Directory of static files served before the root, relative to the root
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Quiet period before a changed file is processed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// File and directory patterns the watcher skips (`node_modules`, `*.log`)
    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,

    /// Open the browser once listening
    #[serde(default)]
    pub open: bool,
}

impl Default for KiteConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl KiteConfig {
    /// Default configuration values.
    pub fn default_config() -> Self {
        Self {
            root: default_root(),
            host: default_host(),
            port: default_port(),
            hmr_path: default_hmr_path(),
            bare_module_route: default_bare_module_route(),
            public_dir: default_public_dir(),
            debounce_ms: default_debounce_ms(),
            watch_ignore: default_watch_ignore(),
            open: false,
        }
    }
}
