//! Dependency registry for bare imports.
//!
//! `import "vue"` is rewritten to `<bare route>/vue`; requests under that
//! route are answered from here. A pre-bundled file in `.kite/deps` wins,
//! otherwise the package's own ES entry in `node_modules` is used.

use kite_graph::ModuleId;
use kite_hmr::HmrError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory of pre-bundled dependencies, relative to the root.
pub const PREBUNDLED_DIR: &str = ".kite/deps";

/// A dependency name resolved to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// File to serve
    pub path: PathBuf,
    /// Name the file lives under below the bare route; relative imports
    /// inside it resolve against this.
    pub url_name: String,
}

/// The fields of `package.json` that pick an entry point.
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    module: Option<String>,
    main: Option<String>,
}

/// Resolves bare names against a project root.
#[derive(Debug, Clone)]
pub struct DependencyRegistry {
    root: PathBuf,
}

impl DependencyRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `name` (`vue`, `@vue/shared`, `lodash-es/debounce.js`).
    pub async fn resolve(&self, name: &str) -> Result<ResolvedDependency, HmrError> {
        let prebundled = self.root.join(PREBUNDLED_DIR);

        let bundled = prebundled.join(format!("{name}.js"));
        if is_file(&bundled).await {
            debug!(name, path = %bundled.display(), "resolved pre-bundled dependency");
            return Ok(ResolvedDependency {
                path: bundled,
                url_name: name.to_string(),
            });
        }

        // Chunks imported by a pre-bundled file carry their own extension.
        let chunk = prebundled.join(name);
        if has_extension(name) && is_file(&chunk).await {
            return Ok(ResolvedDependency {
                path: chunk,
                url_name: name.to_string(),
            });
        }

        let package = self.root.join("node_modules").join(name);
        if is_file(&package).await {
            return Ok(ResolvedDependency {
                path: package,
                url_name: name.to_string(),
            });
        }

        let manifest_path = package.join("package.json");
        match tokio::fs::read_to_string(&manifest_path).await {
            Ok(raw) => {
                let manifest: PackageManifest = match serde_json::from_str(&raw) {
                    Ok(manifest) => manifest,
                    Err(e) => {
                        return Err(HmrError::Parse {
                            id: ModuleId::new(format!("/node_modules/{name}/package.json"))?,
                            message: e.to_string(),
                        })
                    }
                };
                let entry = manifest
                    .module
                    .or(manifest.main)
                    .unwrap_or_else(|| "index.js".to_string());
                let entry = entry.trim_start_matches("./");

                debug!(name, entry, "resolved package entry");
                Ok(ResolvedDependency {
                    path: package.join(entry),
                    url_name: format!("{name}/{entry}"),
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(HmrError::NotFound(package))
            }
            Err(err) => Err(HmrError::Io(err)),
        }
    }
}

fn has_extension(name: &str) -> bool {
    name.rsplit('/')
        .next()
        .is_some_and(|file| file.rfind('.').is_some_and(|pos| pos > 0))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
