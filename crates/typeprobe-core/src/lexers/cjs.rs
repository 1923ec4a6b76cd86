//! CommonJS export lexer.
//!
//! Recognizes the export-assignment idioms hand-written and transpiled
//! CommonJS uses, without building a syntax tree.

use super::ModuleExports;
use crate::syntax::cursor::Cursor;
use crate::syntax::declarations::block_members;
use crate::syntax::lexer::{tokenize, Token};
use regex_lite::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// esbuild's minified helper prologue.
const BUNDLER_FINGERPRINT: &str = r"var \w+=Object\.defineProperty;var \w+=Object\.getOwnPropertyDescriptor;var \w+=Object\.getOwnPropertyNames;var \w+=Object\.prototype\.hasOwnProperty;";

fn fingerprint() -> Option<&'static Regex> {
    static FINGERPRINT: OnceLock<Option<Regex>> = OnceLock::new();
    FINGERPRINT
        .get_or_init(|| Regex::new(BUNDLER_FINGERPRINT).ok())
        .as_ref()
}

/// Whether the source carries a minified bundler's export helper prologue.
#[must_use]
pub fn matches_bundler_fingerprint(source: &str) -> bool {
    fingerprint().is_some_and(|re| re.is_match(source))
}

/// Lex a CommonJS module.
#[must_use]
pub fn lex(source: &str) -> ModuleExports {
    let tokens = tokenize(source);
    lex_tokens(source, &tokens)
}

/// Lex a CommonJS module from already-computed tokens.
#[must_use]
pub fn lex_tokens(source: &str, tokens: &[Token]) -> ModuleExports {
    let c = Cursor::new(source, tokens);
    let mut out = ModuleExports::default();
    let requires = require_bindings(c);

    let mut i = 0;
    while i < c.len() {
        let module_exports = c.is_free_ident(i, "module") && c.is(i + 1, ".") && c.is(i + 2, "exports");

        if module_exports || c.is_free_ident(i, "exports") {
            let after = if module_exports { i + 3 } else { i + 1 };
            if let Some(name) = assigned_property(c, after) {
                out.add_name(name);
            } else if module_exports && c.is(after, "=") {
                module_exports_assignment(c, after + 1, &mut out);
            }
        } else if c.is_free_ident(i, "Object") && c.is(i + 1, ".") {
            object_helper(c, i, &requires, &mut out);
        } else if matches!(c.text(i), "__exportStar" | "__export") {
            if !export_star_helper(c, i, &requires, &mut out) {
                getter_object_helper(c, i, &mut out);
            }
        } else if c.is_ident(i) && c.is(i + 1, "(") {
            getter_object_helper(c, i, &mut out);
        }
        i += 1;
    }
    out
}

/// `.x =` or `["x"] =` following an exports object.
fn assigned_property(c: Cursor<'_>, at: usize) -> Option<String> {
    if c.is(at, ".") && c.is_ident(at + 1) && c.is(at + 2, "=") {
        return Some(c.text(at + 1).to_string());
    }
    if c.is(at, "[") && c.is(at + 2, "]") && c.is(at + 3, "=") {
        return c.string_value(at + 1);
    }
    None
}

/// `module.exports = <value>` with the value starting at `from`.
fn module_exports_assignment(c: Cursor<'_>, from: usize, out: &mut ModuleExports) {
    if let Some(specifier) = require_call(c, from) {
        out.add_reexport(specifier);
        return;
    }
    if !c.is(from, "{") {
        return;
    }
    for member in block_members(c, from) {
        out.add_name(member.name);
    }
    let depth = c.depth(from) + 1;
    let close = c.matching_close(from).unwrap_or(c.len());
    for k in from + 1..close {
        if c.depth(k) == depth && c.is(k, "...") {
            if let Some(specifier) = require_call(c, k + 1) {
                out.add_reexport(specifier);
            }
        }
    }
}

/// `require("x")` at `at`.
fn require_call(c: Cursor<'_>, at: usize) -> Option<String> {
    if c.is_free_ident(at, "require") && c.is(at + 1, "(") && c.is(at + 3, ")") {
        return c.string_value(at + 2);
    }
    None
}

/// `Object.defineProperty(exports, "x", ...)` and `Object.keys(_x).forEach(...)`.
fn object_helper(
    c: Cursor<'_>,
    i: usize,
    requires: &FxHashMap<String, String>,
    out: &mut ModuleExports,
) {
    if c.is(i + 2, "defineProperty") && c.is(i + 3, "(") {
        let name_at = if c.is(i + 4, "exports") {
            i + 6
        } else if c.is(i + 4, "module") && c.is(i + 5, ".") && c.is(i + 6, "exports") {
            i + 8
        } else {
            return;
        };
        if let Some(name) = c.string_value(name_at) {
            out.add_name(name);
        }
    } else if c.is(i + 2, "keys") && c.is(i + 3, "(") && c.is(i + 5, ")") && c.is(i + 6, ".") && c.is(i + 7, "forEach") {
        if let Some(specifier) = requires.get(c.text(i + 4)) {
            out.add_reexport(specifier.clone());
        }
    }
}

/// `__exportStar(require("x"), exports)`, `__export(require("x"))`, and the
/// `(0, tslib.__exportStar)(...)` call form, with a require or a bound name.
fn export_star_helper(
    c: Cursor<'_>,
    i: usize,
    requires: &FxHashMap<String, String>,
    out: &mut ModuleExports,
) -> bool {
    let mut k = i + 1;
    if c.is(k, ")") {
        k += 1;
    }
    if !c.is(k, "(") {
        return false;
    }
    if let Some(specifier) = require_call(c, k + 1) {
        out.add_reexport(specifier);
        return true;
    }
    match requires.get(c.text(k + 1)) {
        Some(specifier) if matches!(c.text(k + 2), "," | ")") => {
            out.add_reexport(specifier.clone());
            true
        }
        _ => false,
    }
}

/// `helper(target, { foo: () => foo, bar: () => bar })`: the keys are exports.
fn getter_object_helper(c: Cursor<'_>, i: usize, out: &mut ModuleExports) {
    let open_paren = i + 1;
    if !(c.is_ident(open_paren + 1) && c.is(open_paren + 2, ",") && c.is(open_paren + 3, "{")) {
        return;
    }
    let object = open_paren + 3;
    let Some(close) = c.matching_close(object) else {
        return;
    };
    if !c.is(close + 1, ")") {
        return;
    }
    // The first value must be a getter for the object to count.
    let first_value = object + 3;
    let is_getter = c.is(object + 2, ":")
        && ((c.is(first_value, "(") && c.is(first_value + 1, ")") && c.is(first_value + 2, "=>"))
            || c.is(first_value, "function"));
    if !is_getter {
        return;
    }
    for member in block_members(c, object) {
        out.add_name(member.name);
    }
}

/// Local names bound to `require("x")`, possibly through an interop wrapper.
fn require_bindings(c: Cursor<'_>) -> FxHashMap<String, String> {
    let mut map = FxHashMap::default();
    for i in 0..c.len() {
        if !(c.is_ident(i) && c.is(i + 1, "=")) {
            continue;
        }
        let mut k = i + 2;
        // __importStar(require("x")), _interopRequireWildcard(require("x"))
        if c.is_ident(k) && !c.is(k, "require") && c.is(k + 1, "(") {
            k += 2;
        }
        if let Some(specifier) = require_call(c, k) {
            map.entry(c.text(i).to_string()).or_insert(specifier);
        }
    }
    map
}
