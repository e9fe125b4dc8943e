//! Specifier discovery over the oxc AST.

use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression,
    StringLiteral,
};
use oxc_ast_visit::{walk, Visit};

/// How a specifier was referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import ... from "x"` or `import "x"`.
    Static,
    /// `export ... from "x"` or `export * from "x"`.
    ReExport,
    /// `import("x")` with a literal argument.
    Dynamic,
}

/// A specifier literal and the byte range of its text, quotes excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FoundSpecifier {
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub kind: ImportKind,
}

/// Collects every runtime import specifier in source order.
///
/// Type-only imports and exports are skipped since they vanish at runtime.
#[derive(Default)]
pub(crate) struct SpecifierCollector {
    pub found: Vec<FoundSpecifier>,
}

impl SpecifierCollector {
    fn push(&mut self, literal: &StringLiteral<'_>, kind: ImportKind) {
        let start = literal.span.start as usize + 1;
        let end = (literal.span.end as usize).saturating_sub(1);
        if end < start {
            return;
        }
        self.found.push(FoundSpecifier {
            value: literal.value.to_string(),
            start,
            end,
            kind,
        });
    }
}

impl<'a> Visit<'a> for SpecifierCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if !decl.import_kind.is_type() {
            self.push(&decl.source, ImportKind::Static);
        }
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        match &decl.source {
            Some(source) if !decl.export_kind.is_type() => self.push(source, ImportKind::ReExport),
            Some(_) => {}
            None => walk::walk_export_named_declaration(self, decl),
        }
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            self.push(&decl.source, ImportKind::ReExport);
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &expr.source {
            self.push(literal, ImportKind::Dynamic);
        }
        walk::walk_import_expression(self, expr);
    }
}
