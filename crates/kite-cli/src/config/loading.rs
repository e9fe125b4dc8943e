use crate::cli::{CheckArgs, DevArgs};
use crate::config::KiteConfig;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    value::Value,
    Figment,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "kite.config.json";

/// Keys the environment provider may set (`KITE_PORT`, `KITE_HMR_PATH`, ...).
const ENV_KEYS: [&str; 9] = [
    "root",
    "host",
    "port",
    "hmr_path",
    "bare_module_route",
    "public_dir",
    "debounce_ms",
    "watch_ignore",
    "open",
];

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl From<&DevArgs> for ConfigOverrides {
    fn from(args: &DevArgs) -> Self {
        Self {
            root: args.root.clone(),
            host: args.host.clone(),
            port: args.port,
            open: args.open.then_some(true),
        }
    }
}

impl From<&CheckArgs> for ConfigOverrides {
    fn from(args: &CheckArgs) -> Self {
        Self {
            root: args.root.clone(),
            ..Self::default()
        }
    }
}

impl KiteConfig {
    /// Load configuration from all sources.
    ///
    /// Priority: CLI args > `KITE_*` environment variables > config file > defaults.
    /// Without an explicit `config_path`, `kite.config.json` in the CLI root
    /// (or the current directory) is used when it exists.
    pub fn load(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config()));

        if let Some(path) = Self::config_file(overrides, config_path)? {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::string(&read_config_file(&path)?));
        }

        for (key, value) in env_values() {
            figment = figment.merge((key, value));
        }
        figment = figment.merge(Serialized::defaults(overrides));

        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: "Check kite.config.json syntax and field types".to_string(),
            }
            .into()
        })
    }

    fn config_file(
        overrides: &ConfigOverrides,
        config_path: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        if let Some(path) = config_path {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            return Ok(Some(path.to_path_buf()));
        }

        let root = overrides.root.as_deref().unwrap_or_else(|| Path::new("."));
        let default_path = root.join(CONFIG_FILE_NAME);
        Ok(default_path.is_file().then_some(default_path))
    }
}

/// Read a config file, rejecting malformed JSON before any layer is merged.
///
/// Type and unknown-field problems are left to extraction, which names the
/// offending key.
fn read_config_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    serde_json::from_str::<serde_json::Value>(&raw).map_err(ConfigError::InvalidJson)?;
    Ok(raw)
}

/// `KITE_*` variables as camelCase config keys with parsed values.
///
/// `KITE_HMR_PATH=/__hmr` becomes `("hmrPath", "/__hmr")`, `KITE_PORT=4000`
/// becomes `("port", 4000)`.
fn env_values() -> Vec<(String, Value)> {
    Env::prefixed("KITE_")
        .only(&ENV_KEYS)
        .iter()
        .map(|(key, raw)| {
            let value = raw.parse::<Value>().unwrap_or_else(|never| match never {});
            (camel_case(&key.as_str().to_ascii_lowercase()), value)
        })
        .collect()
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
