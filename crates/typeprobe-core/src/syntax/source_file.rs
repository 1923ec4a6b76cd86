//! Parsed source files.

use super::cursor::Cursor;
use super::declarations::{bind, Declarations};
use super::lexer::{tokenize, Span, Token, TokenKind};
use crate::kinds::{is_declaration_file, is_javascript_file};
use std::cell::OnceCell;

/// How a module reference appears in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `import ... from "x"` or `import "x"`.
    ImportDeclaration,
    /// `export ... from "x"`.
    ExportFrom,
    /// `import x = require("x")`.
    ImportEquals,
    /// `require("x")` in JavaScript.
    Require,
    /// `import("x")` as an expression.
    DynamicImport,
    /// `import("x")` in a type position of a declaration file.
    ImportType,
}

/// A module specifier referenced by a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub specifier: String,
    pub span: Span,
    pub kind: ReferenceKind,
}

/// A tokenized file plus the facts every host needs about it.
#[derive(Debug)]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
    pub tokens: Vec<Token>,
    pub references: Vec<ModuleReference>,
    /// First top-level `import`/`export` statement.
    pub esm_indicator: Option<Span>,
    /// First `require()` call or `module.exports`/`exports.x` assignment.
    pub cjs_indicator: Option<Span>,
    declarations: OnceCell<Declarations>,
}

impl SourceFile {
    #[must_use]
    pub fn parse(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let text = text.into();
        let tokens = if file_name.ends_with(".json") {
            Vec::new()
        } else {
            tokenize(&text)
        };

        let mut file = Self {
            file_name,
            text,
            tokens,
            references: Vec::new(),
            esm_indicator: None,
            cjs_indicator: None,
            declarations: OnceCell::new(),
        };
        file.scan();
        file
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.text, &self.tokens)
    }

    /// Top-level declarations and exports, bound on first use.
    pub fn declarations(&self) -> &Declarations {
        self.declarations.get_or_init(|| bind(self.cursor()))
    }

    /// Text covered by a span.
    #[must_use]
    pub fn slice(&self, span: Span) -> &str {
        self.text
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
    }

    fn scan(&mut self) {
        let c = Cursor::new(&self.text, &self.tokens);
        let javascript = is_javascript_file(&self.file_name);
        let declaration = is_declaration_file(&self.file_name);
        let mut references = Vec::new();
        let mut esm_indicator = None;
        let mut cjs_indicator = None;
        let mut ambient_module_end = 0;

        let mut i = 0;
        while i < c.len() {
            let depth = c.depth(i);

            // Skip `declare module "x" { ... }` bodies; their imports belong to that module.
            if depth == 0 && c.is(i, "module") && c.kind(i + 1) == Some(TokenKind::Str) && c.is(i + 2, "{") {
                ambient_module_end = c.skip_group(i + 2);
            }
            if i < ambient_module_end {
                i += 1;
                continue;
            }

            if c.is_free_ident(i, "import") {
                if c.is(i + 1, "(") {
                    if let Some(specifier) = c.string_value(i + 2) {
                        let kind = if declaration {
                            ReferenceKind::ImportType
                        } else {
                            ReferenceKind::DynamicImport
                        };
                        references.push(ModuleReference {
                            specifier,
                            span: c.span(i + 2),
                            kind,
                        });
                    }
                    i += 1;
                    continue;
                }
                if depth == 0 && !c.is(i + 1, ".") {
                    let end = c.statement_end(i);
                    esm_indicator.get_or_insert(c.span_of(i, end));
                    if let Some(reference) = import_reference(c, i, end) {
                        references.push(reference);
                    }
                    i = end;
                    continue;
                }
                if depth == 0 {
                    esm_indicator.get_or_insert(c.span_of(i, i + 3));
                }
            } else if depth == 0 && c.is_free_ident(i, "export") {
                let end = c.statement_end(i);
                esm_indicator.get_or_insert(c.span_of(i, end));
                if let Some(from) = c.find_at_depth(i + 1, end, 0, "from") {
                    if let Some(specifier) = c.string_value(from + 1) {
                        references.push(ModuleReference {
                            specifier,
                            span: c.span(from + 1),
                            kind: ReferenceKind::ExportFrom,
                        });
                    }
                }
                // Declarations nested in the statement (e.g. namespaces) are still scanned.
                i += 1;
                continue;
            } else if javascript && c.is_free_ident(i, "require") && c.is(i + 1, "(") {
                if let Some(specifier) = c.string_value(i + 2) {
                    if c.is(i + 3, ")") {
                        cjs_indicator.get_or_insert(c.span_of(i, i + 4));
                        references.push(ModuleReference {
                            specifier,
                            span: c.span(i + 2),
                            kind: ReferenceKind::Require,
                        });
                    }
                }
            } else if javascript && cjs_indicator.is_none() && is_exports_assignment(c, i) {
                let end = c.statement_end(i);
                cjs_indicator = Some(c.span_of(i, end));
            }
            i += 1;
        }

        self.references = references;
        self.esm_indicator = esm_indicator;
        self.cjs_indicator = cjs_indicator;
    }
}

/// Reference made by the import statement spanning `[start, end)`.
fn import_reference(c: Cursor<'_>, start: usize, end: usize) -> Option<ModuleReference> {
    // import "x"
    if let Some(specifier) = c.string_value(start + 1) {
        return Some(ModuleReference {
            specifier,
            span: c.span(start + 1),
            kind: ReferenceKind::ImportDeclaration,
        });
    }

    // import [type] x = require("x")
    if let Some(eq) = c.find_at_depth(start + 1, end.min(start + 4), 0, "=") {
        if c.is(eq + 1, "require") && c.is(eq + 2, "(") {
            let specifier = c.string_value(eq + 3)?;
            return Some(ModuleReference {
                specifier,
                span: c.span(eq + 3),
                kind: ReferenceKind::ImportEquals,
            });
        }
        return None;
    }

    let from = c.find_at_depth(start + 1, end, 0, "from")?;
    let specifier = c.string_value(from + 1)?;
    Some(ModuleReference {
        specifier,
        span: c.span(from + 1),
        kind: ReferenceKind::ImportDeclaration,
    })
}

/// `module.exports ...=`, `exports.x =` or `exports["x"] =` starting at `i`.
pub(crate) fn is_exports_assignment(c: Cursor<'_>, i: usize) -> bool {
    let target_end = if c.is_free_ident(i, "module") && c.is(i + 1, ".") && c.is(i + 2, "exports") {
        i + 3
    } else if c.is_free_ident(i, "exports") {
        i + 1
    } else {
        return false;
    };
    let mut j = target_end;
    loop {
        match c.text(j) {
            "." if c.is_ident(j + 1) => j += 2,
            "[" => j = c.skip_group(j),
            "=" => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(file: &SourceFile) -> Vec<(&str, ReferenceKind)> {
        file.references
            .iter()
            .map(|r| (r.specifier.as_str(), r.kind))
            .collect()
    }

    #[test]
    fn test_declaration_file_references() {
        let file = SourceFile::parse(
            "/node_modules/pkg/index.d.ts",
            "import { A } from './a.js';\nimport type B from \"./b\";\nexport * from './c';\nexport declare function f(): import('./d').D;\nimport e = require('./e');",
        );
        assert_eq!(
            specifiers(&file),
            vec![
                ("./a.js", ReferenceKind::ImportDeclaration),
                ("./b", ReferenceKind::ImportDeclaration),
                ("./c", ReferenceKind::ExportFrom),
                ("./d", ReferenceKind::ImportType),
                ("./e", ReferenceKind::ImportEquals),
            ]
        );
        assert!(file.esm_indicator.is_some());
        assert!(file.cjs_indicator.is_none());
    }

    #[test]
    fn test_javascript_commonjs_indicators() {
        let src = "'use strict';\nconst a = require('./a');\nmodule.exports = a;";
        let file = SourceFile::parse("/node_modules/pkg/index.js", src);
        assert_eq!(specifiers(&file), vec![("./a", ReferenceKind::Require)]);
        assert!(file.esm_indicator.is_none());
        let span = file.cjs_indicator.unwrap();
        assert_eq!(file.slice(span), "require('./a')");
    }

    #[test]
    fn test_exports_assignment_indicator() {
        let src = "exports.default = 1;";
        let file = SourceFile::parse("/node_modules/pkg/index.js", src);
        assert_eq!(file.slice(file.cjs_indicator.unwrap()), "exports.default = 1");
    }

    #[test]
    fn test_esm_indicator_is_statement() {
        let src = "const x = 1;\nexport default x;\n";
        let file = SourceFile::parse("/node_modules/pkg/index.js", src);
        assert_eq!(file.slice(file.esm_indicator.unwrap()), "export default x");
    }

    #[test]
    fn test_nested_and_member_requires_ignored() {
        let src = "foo.require('x'); function f() { import('./lazy'); }";
        let file = SourceFile::parse("/node_modules/pkg/index.js", src);
        assert_eq!(specifiers(&file), vec![("./lazy", ReferenceKind::DynamicImport)]);
        assert!(file.esm_indicator.is_none());
        assert!(file.cjs_indicator.is_none());
    }

    #[test]
    fn test_ambient_module_bodies_skipped() {
        let src = "declare module 'other' { import x from './x'; }\nexport {};";
        let file = SourceFile::parse("/node_modules/pkg/index.d.ts", src);
        assert!(file.references.is_empty());
    }
}
