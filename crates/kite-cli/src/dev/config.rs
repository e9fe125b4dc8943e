//! Development server configuration.
//!
//! The validated [`KiteConfig`] resolved against the filesystem and network:
//! an absolute root and a bindable address.

use crate::config::KiteConfig;
use crate::error::{ConfigError, Result, ResultExt};
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::path::PathBuf;

/// Dev server settings after resolution.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Canonical project root
    pub root: PathBuf,

    /// Address the server binds
    pub addr: SocketAddr,

    /// Open the browser on start
    pub open: bool,

    /// Route of the HMR WebSocket endpoint
    pub hmr_path: String,

    /// Route prefix of the dependency registry
    pub bare_module_route: String,

    /// Absolute directory of static files served before the root
    pub public_dir: PathBuf,

    /// Watcher ignore patterns
    pub watch_ignore: Vec<String>,

    /// Per-file quiet period before a change is processed
    pub debounce_ms: u64,
}

impl DevConfig {
    /// Resolve a validated config, probing for a free port.
    pub fn from_config(config: &KiteConfig) -> Result<Self> {
        let mut dev = Self::resolve(config)?;
        dev.addr = find_available_port(dev.addr)?;
        Ok(dev)
    }

    /// Resolve a validated config without touching the network.
    pub fn resolve(config: &KiteConfig) -> Result<Self> {
        let root = std::fs::canonicalize(&config.root).with_path(&config.root)?;

        let ip: IpAddr = config.host.parse().map_err(|_| ConfigError::InvalidValue {
            field: "host".to_string(),
            value: config.host.clone(),
            hint: "Use an IP address such as 127.0.0.1 or 0.0.0.0".to_string(),
        })?;

        Ok(Self {
            public_dir: root.join(&config.public_dir),
            root,
            addr: SocketAddr::new(ip, config.port),
            open: config.open,
            hmr_path: config.hmr_path.trim_end_matches('/').to_string(),
            bare_module_route: config.bare_module_route.trim_end_matches('/').to_string(),
            watch_ignore: config.watch_ignore.clone(),
            debounce_ms: config.debounce_ms,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// The requested address, or the first free port among the next ten.
fn find_available_port(requested: SocketAddr) -> Result<SocketAddr> {
    let port = requested.port();
    if port != 0 && port < 1024 {
        crate::ui::warning(&format!(
            "Port {} is in privileged range, may require root access",
            port
        ));
    }

    if TcpListener::bind(requested).is_ok() {
        return Ok(requested);
    }

    for offset in 1..=10 {
        let candidate = SocketAddr::new(requested.ip(), port.saturating_add(offset));
        if TcpListener::bind(candidate).is_ok() {
            crate::ui::warning(&format!(
                "Port {} is busy, using port {} instead",
                port,
                candidate.port()
            ));
            return Ok(candidate);
        }
    }

    Err(ConfigError::InvalidValue {
        field: "port".to_string(),
        value: port.to_string(),
        hint: format!(
            "Ports {}-{} are all in use. Try a different port range.",
            port,
            port.saturating_add(10)
        ),
    }
    .into())
}
