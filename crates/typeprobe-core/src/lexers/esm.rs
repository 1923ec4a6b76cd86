//! ECMAScript module export lexer.
//!
//! Walks top-level statements only.

use super::ModuleExports;
use crate::syntax::cursor::Cursor;
use crate::syntax::declarations::{binding_names, specifier_list};
use crate::syntax::lexer::{tokenize, Token};

/// Lex an ECMAScript module.
#[must_use]
pub fn lex(source: &str) -> ModuleExports {
    let tokens = tokenize(source);
    lex_tokens(source, &tokens)
}

/// Lex an ECMAScript module from already-computed tokens.
#[must_use]
pub fn lex_tokens(source: &str, tokens: &[Token]) -> ModuleExports {
    let c = Cursor::new(source, tokens);
    let mut out = ModuleExports::default();

    let mut i = 0;
    while i < c.len() {
        if c.depth(i) != 0 || !c.is_free_ident(i, "export") {
            i += 1;
            continue;
        }
        let end = c.statement_end(i);
        export_statement(c, i + 1, end, &mut out);
        i = end.max(i + 1);
    }
    out
}

fn export_statement(c: Cursor<'_>, j: usize, end: usize, out: &mut ModuleExports) {
    match c.text(j) {
        "default" => out.add_name("default"),
        "*" => {
            let Some(from) = c.find_at_depth(j, end, 0, "from") else {
                return;
            };
            if c.is(j + 1, "as") {
                if let Some(name) = c.property_name(j + 2) {
                    out.add_name(name);
                }
            } else if let Some(specifier) = c.string_value(from + 1) {
                out.add_reexport(specifier);
            }
        }
        "{" => {
            let close = c.matching_close(j).unwrap_or(end);
            for (_, exported, type_only) in specifier_list(c, j, close) {
                if !type_only {
                    out.add_name(exported);
                }
            }
        }
        "async" if c.is(j + 1, "function") => export_statement(c, j + 1, end, out),
        "function" => {
            let name_at = if c.is(j + 1, "*") { j + 2 } else { j + 1 };
            if c.is_ident(name_at) {
                out.add_name(c.text(name_at));
            }
        }
        "class" => {
            if c.is_ident(j + 1) {
                out.add_name(c.text(j + 1));
            }
        }
        "const" | "let" | "var" => {
            let mut k = j + 1;
            while k < end {
                if c.is_ident(k) {
                    out.add_name(c.text(k));
                } else if matches!(c.text(k), "{" | "[") {
                    for name in binding_names(c, k) {
                        out.add_name(name);
                    }
                }
                // next declarator
                k = (k..end)
                    .find(|&x| c.depth(x) == 0 && c.is(x, ","))
                    .map_or(end, |comma| comma + 1);
            }
        }
        _ => {}
    }
}
