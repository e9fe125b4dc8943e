use crate::config::KiteConfig;
use crate::error::{ConfigError, Result};

/// Validate a route such as `hmrPath`: absolute, not the site root, no query.
pub fn validate_route(field: &str, route: &str) -> Result<()> {
    let hint = if !route.starts_with('/') {
        Some("Routes must start with '/'")
    } else if route.trim_end_matches('/').is_empty() {
        Some("Route cannot be the site root")
    } else if route.contains(['?', '#']) {
        Some("Routes cannot carry a query or fragment")
    } else {
        None
    };

    match hint {
        Some(hint) => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: route.to_string(),
            hint: hint.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

impl KiteConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        validate_route("hmrPath", &self.hmr_path)?;
        validate_route("bareModuleRoute", &self.bare_module_route)?;

        if self.hmr_path.trim_end_matches('/') == self.bare_module_route.trim_end_matches('/') {
            return Err(ConfigError::InvalidValue {
                field: "hmrPath".to_string(),
                value: self.hmr_path.clone(),
                hint: "hmrPath and bareModuleRoute must differ".to_string(),
            }
            .into());
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "host".to_string(),
                hint: "Provide an address to bind, e.g. 127.0.0.1".to_string(),
            }
            .into());
        }

        if self.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "debounceMs".to_string(),
                value: "0".to_string(),
                hint: "Use a positive quiet period, e.g. 100".to_string(),
            }
            .into());
        }

        if !self.root.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "root".to_string(),
                value: self.root.display().to_string(),
                hint: "Project root does not exist or is not a directory".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
