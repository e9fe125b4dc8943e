//! Import specifier rewriting.
//!
//! Browsers only fetch URLs, so every import specifier in a served module is
//! rewritten into one: bare names route through the dependency registry and
//! paths gain the `import` marker that tells the server to answer with a
//! JavaScript module. Rewriting is also where the dependency graph learns
//! what each module imports.

mod collect;
mod default_export;

use oxc_allocator::Allocator;
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::debug;

use kite_graph::{DependencyGraph, ModuleId};

use crate::error::{HmrError, Result};
use crate::request::ModuleRequest;

pub use collect::ImportKind;
pub use default_export::rewrite_default_export;

use collect::SpecifierCollector;

/// One rewritten specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenImport {
    /// Specifier as written in the source.
    pub specifier: String,
    /// URL that replaced it.
    pub url: String,
    /// Graph node the import points at.
    pub target: ModuleId,
    pub kind: ImportKind,
    pub bare: bool,
}

/// Rewritten code plus the imports found in it, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutput {
    pub code: String,
    pub imports: Vec<RewrittenImport>,
}

/// Rewrites specifiers and records the importer's edges.
#[derive(Debug, Clone)]
pub struct ImportRewriter {
    graph: DependencyGraph,
    bare_route: String,
}

impl ImportRewriter {
    pub fn new(graph: DependencyGraph, bare_route: impl Into<String>) -> Self {
        let bare_route = bare_route.into().trim_end_matches('/').to_string();
        Self { graph, bare_route }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn bare_route(&self) -> &str {
        &self.bare_route
    }

    /// Rewrite `source` served for `importer` and record its import edges.
    ///
    /// Edges are recorded under the importer's own id, which is a derived id
    /// for component sub-resources. A token on the importer's request is
    /// passed on to every rewritten specifier so a forced reload re-fetches
    /// direct dependencies too. When parsing fails the graph is left alone.
    pub fn rewrite(
        &self,
        importer: &ModuleRequest,
        source: &str,
        source_type: SourceType,
    ) -> Result<RewriteOutput> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if ret.panicked || !ret.errors.is_empty() {
            return Err(HmrError::Parse {
                id: importer.id.clone(),
                message: join_errors(&ret.errors),
            });
        }

        let mut collector = SpecifierCollector::default();
        collector.visit_program(&ret.program);

        let suffix = importer.timestamp_suffix();
        let mut code = String::with_capacity(source.len() + collector.found.len() * 16);
        let mut imports = Vec::with_capacity(collector.found.len());
        let mut cursor = 0;

        for found in collector.found {
            let Some((url, target, bare)) =
                self.rewrite_specifier(&importer.id, &found.value, &suffix)?
            else {
                continue;
            };
            code.push_str(&source[cursor..found.start]);
            code.push_str(&url);
            cursor = found.end;

            imports.push(RewrittenImport {
                specifier: found.value,
                url,
                target,
                kind: found.kind,
                bare,
            });
        }
        code.push_str(&source[cursor..]);

        let delta = self
            .graph
            .record_edges(&importer.id, imports.iter().map(|import| import.target.clone()));
        if !delta.is_empty() {
            debug!(
                module = %importer.id,
                added = ?delta.added,
                removed = ?delta.removed,
                "import edges changed"
            );
        }

        Ok(RewriteOutput { code, imports })
    }

    /// URL, graph target and bareness for one specifier; `None` leaves it as written.
    fn rewrite_specifier(
        &self,
        importer: &ModuleId,
        specifier: &str,
        suffix: &str,
    ) -> Result<Option<(String, ModuleId, bool)>> {
        if specifier.is_empty() || is_external_url(specifier) {
            return Ok(None);
        }

        if is_path_specifier(specifier) {
            let separator = if specifier.contains('?') { '&' } else { '?' };
            let url = format!("{specifier}{separator}import{suffix}");
            let target = importer.resolve(specifier)?;
            return Ok(Some((url, target, false)));
        }

        let target = ModuleId::bare(&self.bare_route, specifier)?;
        let url = format!("{}/{specifier}?import{suffix}", self.bare_route);
        Ok(Some((url, target, true)))
    }
}

/// Relative or root-absolute specifiers are served from the project itself.
fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with('/')
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
}

/// Full URLs are fetched by the browser as-is and never enter the graph.
fn is_external_url(specifier: &str) -> bool {
    specifier.starts_with("//")
        || specifier.starts_with("data:")
        || specifier.starts_with("blob:")
        || specifier.contains("://")
}

/// Pick the oxc source type for a script language or file extension.
pub fn source_type_for(lang: &str) -> SourceType {
    match lang {
        "ts" | "mts" | "cts" => SourceType::ts(),
        "tsx" => SourceType::tsx(),
        "jsx" => SourceType::jsx(),
        _ => SourceType::mjs(),
    }
}

pub(crate) fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    if errors.is_empty() {
        return "parser aborted".to_string();
    }
    errors
        .iter()
        .map(|error| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
