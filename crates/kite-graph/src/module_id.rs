use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Query keys that select a sub-resource of a structured file.
///
/// They are the only query keys that survive normalization, in this order.
const DERIVING_KEYS: [&str; 2] = ["type", "index"];

/// Canonical identifier for a module served by the dev server.
///
/// Every graph and cache lookup is keyed by this type. The identifier is a
/// root-relative URL path: it always starts with `/`, uses forward slashes, and
/// has `.`/`..` segments resolved. Query strings are dropped, except for the
/// `type`/`index` pair that addresses a sub-resource of a structured file
/// (`/App.vue?type=style&index=1`). Those *derived* identifiers never alias the
/// file's own node.
///
/// Cache-busting (`t`) and `import` markers never reach the identifier, so two
/// requests that differ only in those resolve to the same module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    /// Normalize a request path or relative path into an id.
    ///
    /// `App.vue`, `./App.vue`, `/App.vue` and `/App.vue?t=123&import` all map to
    /// `/App.vue`. The path part is percent-decoded, so `/my%20comp.vue` names
    /// the same file as the watcher's `/my comp.vue`.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ModuleIdError> {
        let (path, query) = split_query(raw.as_ref().trim());
        let decoded = percent_decode(path)?;
        Self::from_parts(&decoded, query)
    }

    /// Build an id from a path that is already decoded.
    fn from_parts(path: &str, query: Option<&str>) -> Result<Self, ModuleIdError> {
        if path.is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }

        let mut canonical = normalize_path(path);
        if let Some(query) = query {
            canonical.push_str(&derived_query(query));
        }

        Ok(Self(Arc::from(canonical)))
    }

    /// Convert a filesystem path reported by the watcher into an id.
    ///
    /// This is the same normalization `new` applies to request paths, minus
    /// the percent-decoding, so the rewriter and the watcher always agree on a
    /// file's identity.
    pub fn from_fs_path(root: &Path, path: &Path) -> Result<Self, ModuleIdError> {
        let root = root.to_path_buf().clean();
        let path = if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            root.join(path).clean()
        };

        let relative = path
            .strip_prefix(&root)
            .map_err(|_| ModuleIdError::OutsideRoot { path: path.clone() })?;

        let segments: Vec<Cow<'_, str>> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();

        if segments.is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }

        Self::from_parts(&segments.join("/"), None)
    }

    /// Id of a bare dependency served under `route` (e.g. `/@module/vue`).
    pub fn bare(route: &str, name: &str) -> Result<Self, ModuleIdError> {
        if name.is_empty() {
            return Err(ModuleIdError::EmptyPath);
        }
        Self::new(format!("{}/{}", route.trim_end_matches('/'), name))
    }

    /// Resolve an import specifier written inside this module.
    ///
    /// Absolute specifiers are normalized as-is; relative ones are joined with
    /// this module's directory. A query on the specifier is kept for derivation.
    pub fn resolve(&self, specifier: &str) -> Result<Self, ModuleIdError> {
        if specifier.starts_with('/') {
            return Self::new(specifier);
        }
        let (path, query) = split_query(specifier);
        let decoded = percent_decode(path)?;
        Self::from_parts(&format!("{}/{}", self.dir(), decoded), query)
    }

    /// Borrow the canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The query-free path part.
    pub fn path(&self) -> &str {
        match self.0.split_once('?') {
            Some((path, _)) => path,
            None => &self.0,
        }
    }

    /// Directory part of the path, without a trailing slash (`""` for root files).
    pub fn dir(&self) -> &str {
        let path = self.path();
        match path.rfind('/') {
            Some(pos) => &path[..pos],
            None => "",
        }
    }

    /// The file that owns this id; identity for non-derived ids.
    pub fn owner(&self) -> ModuleId {
        if self.is_derived() {
            Self(Arc::from(self.path()))
        } else {
            self.clone()
        }
    }

    /// Whether the id addresses a sub-resource (`?type=...`) of a file.
    pub fn is_derived(&self) -> bool {
        self.0.contains('?')
    }

    /// Whether the owning file is a structured (single-file component) file.
    pub fn is_structured(&self) -> bool {
        self.extension() == Some("vue")
    }

    /// Extension of the path part, if any.
    pub fn extension(&self) -> Option<&str> {
        let path = self.path();
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rfind('.') {
            Some(0) | None => None,
            Some(pos) => Some(&file[pos + 1..]),
        }
    }

    /// Value of a deriving query key (`type` or `index`).
    pub fn query_value(&self, key: &str) -> Option<&str> {
        let (_, query) = self.0.split_once('?')?;
        query.split('&').find_map(|pair| match pair.split_once('=') {
            Some((k, v)) if k == key => Some(v),
            _ => None,
        })
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ModuleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let (path, query) = split_query(&value);
        ModuleId::from_parts(path, query).map_err(serde::de::Error::custom)
    }
}

/// Error type for `ModuleId` construction failures.
#[derive(Debug, Error)]
pub enum ModuleIdError {
    /// The provided path was empty.
    #[error("module id path is empty")]
    EmptyPath,

    /// A percent-escape in a request path does not decode to UTF-8.
    #[error("module path '{raw}' is not valid percent-encoded UTF-8")]
    InvalidEncoding { raw: String },

    /// A watcher path does not live under the served root.
    #[error("path '{}' is outside the served root", .path.display())]
    OutsideRoot { path: PathBuf },
}

fn split_query(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    }
}

/// Decode `%XX` escapes. A `%` not followed by two hex digits is kept as is.
fn percent_decode(path: &str) -> Result<Cow<'_, str>, ModuleIdError> {
    urlencoding::decode(path).map_err(|_| ModuleIdError::InvalidEncoding {
        raw: path.to_string(),
    })
}

/// Separator-normalize and clean a URL path. `..` never climbs above `/`.
fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    normalized.push_str(&segments.join("/"));
    normalized
}

/// Keep only the deriving keys of a query, in canonical order.
fn derived_query(query: &str) -> String {
    let mut derived = String::new();

    for key in DERIVING_KEYS {
        let value = query.split('&').find_map(|pair| match pair.split_once('=') {
            Some((k, v)) if k == key && !v.is_empty() => Some(v),
            _ => None,
        });

        if let Some(value) = value {
            derived.push(if derived.is_empty() { '?' } else { '&' });
            derived.push_str(key);
            derived.push('=');
            derived.push_str(value);
        }
    }

    derived
}
