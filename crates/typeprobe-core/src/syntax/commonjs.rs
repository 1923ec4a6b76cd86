//! Facts about how a JavaScript file populates `module.exports`.

use super::cursor::Cursor;
use super::declarations::{block_members, expression_is_callable};
use super::lexer::Span;
use super::source_file::SourceFile;

/// Right-hand side of a `module.exports = ...` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedValue {
    Identifier(String),
    /// A function, arrow function or class expression.
    Callable,
    /// An object literal with these keys.
    Object(Vec<String>),
    Require(String),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExportsAssignment {
    pub span: Span,
    pub value: AssignedValue,
    /// Token index of the enclosing function body, `None` at the top level.
    pub scope: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonJsFacts {
    pub assignments: Vec<ModuleExportsAssignment>,
    /// First `exports.default = ...` (or `module.exports.default = ...`) statement.
    pub default_assignment: Option<Span>,
    /// `exports.__esModule = true` or `Object.defineProperty(exports, "__esModule", ...)`.
    pub es_module_marker: bool,
    /// Top-level `name.prop = ...` assignments, as `(name, prop)`.
    pub property_assignments: Vec<(String, String)>,
}

impl CommonJsFacts {
    /// Number of distinct scopes that assign `module.exports`.
    #[must_use]
    pub fn assignment_scopes(&self) -> usize {
        let mut scopes: Vec<Option<usize>> = self.assignments.iter().map(|a| a.scope).collect();
        scopes.sort_unstable();
        scopes.dedup();
        scopes.len()
    }

    /// Properties assigned onto a local, e.g. `fn.extra = ...`.
    pub fn properties_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.property_assignments
            .iter()
            .filter(move |(object, _)| object == name)
            .map(|(_, prop)| prop.as_str())
    }
}

const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

/// Collect the CommonJS facts of a JavaScript file.
#[must_use]
pub fn commonjs_facts(file: &SourceFile) -> CommonJsFacts {
    let c = file.cursor();
    let mut facts = CommonJsFacts::default();

    let mut i = 0;
    while i < c.len() {
        let is_module_exports =
            c.is_free_ident(i, "module") && c.is(i + 1, ".") && c.is(i + 2, "exports");

        if is_module_exports && c.is(i + 3, "=") {
            let end = c.statement_end(i);
            facts.assignments.push(ModuleExportsAssignment {
                span: c.span_of(i, end),
                value: assigned_value(c, i + 4, end),
                scope: function_scope(c, i),
            });
        } else if is_module_exports || c.is_free_ident(i, "exports") {
            let prop_at = if is_module_exports { i + 3 } else { i + 1 };
            if let Some((prop, eq)) = property_target(c, prop_at) {
                if prop == "default" && facts.default_assignment.is_none() {
                    let end = c.statement_end(i);
                    facts.default_assignment = Some(c.span_of(i, end));
                }
                if prop == "__esModule" {
                    facts.es_module_marker = true;
                }
                i = eq;
            }
        } else if c.is_free_ident(i, "Object")
            && c.is(i + 1, ".")
            && c.is(i + 2, "defineProperty")
            && c.is(i + 3, "(")
            && (c.is(i + 4, "exports")
                || (c.is(i + 4, "module") && c.is(i + 5, ".") && c.is(i + 6, "exports")))
        {
            let name_at = if c.is(i + 4, "exports") { i + 6 } else { i + 8 };
            match c.string_value(name_at).as_deref() {
                Some("__esModule") => facts.es_module_marker = true,
                Some("default") if facts.default_assignment.is_none() => {
                    let end = c.statement_end(i);
                    facts.default_assignment = Some(c.span_of(i, end));
                }
                _ => {}
            }
        } else if c.depth(i) == 0
            && c.is_ident(i)
            && (i == 0 || !matches!(c.text(i - 1), "." | "?."))
            && c.is(i + 1, ".")
            && c.is_ident(i + 2)
            && c.is(i + 3, "=")
        {
            facts
                .property_assignments
                .push((c.text(i).to_string(), c.text(i + 2).to_string()));
        }
        i += 1;
    }
    facts
}

/// `.name =` or `["name"] =` at `at`; returns the property and the `=` index.
fn property_target(c: Cursor<'_>, at: usize) -> Option<(String, usize)> {
    if c.is(at, ".") && c.is_ident(at + 1) && c.is(at + 2, "=") {
        return Some((c.text(at + 1).to_string(), at + 2));
    }
    if c.is(at, "[") && c.is(at + 2, "]") && c.is(at + 3, "=") {
        return Some((c.string_value(at + 1)?, at + 3));
    }
    None
}

fn assigned_value(c: Cursor<'_>, from: usize, to: usize) -> AssignedValue {
    if expression_is_callable(c, from, to) {
        return AssignedValue::Callable;
    }
    if c.is(from, "{") {
        let keys = block_members(c, from).into_iter().map(|m| m.name).collect();
        return AssignedValue::Object(keys);
    }
    if c.is(from, "require") && c.is(from + 1, "(") && from + 4 == to {
        if let Some(specifier) = c.string_value(from + 2) {
            return AssignedValue::Require(specifier);
        }
    }
    if c.is_ident(from) && from + 1 == to {
        return AssignedValue::Identifier(c.text(from).to_string());
    }
    AssignedValue::Other
}

/// Innermost function body enclosing token `i`.
fn function_scope(c: Cursor<'_>, i: usize) -> Option<usize> {
    let mut at = i;
    while let Some(open) = c.enclosing_open(at) {
        if c.is(open, "{") && open > 0 && is_function_body(c, open) {
            return Some(open);
        }
        at = open;
    }
    None
}

fn is_function_body(c: Cursor<'_>, open: usize) -> bool {
    let before = open - 1;
    if c.is(before, "=>") {
        return true;
    }
    if !c.is(before, ")") {
        return false;
    }
    let Some(paren) = c.matching_open(before) else {
        return false;
    };
    paren > 0 && !CONTROL_KEYWORDS.contains(&c.text(paren - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(src: &str) -> (SourceFile, CommonJsFacts) {
        let file = SourceFile::parse("/node_modules/pkg/index.js", src);
        let facts = commonjs_facts(&file);
        (file, facts)
    }

    #[test]
    fn test_default_and_marker() {
        let (file, f) = facts("\"use strict\";\nexports.default = foo;\nexports.__esModule = true;\n");
        assert!(f.es_module_marker);
        assert!(f.assignments.is_empty());
        assert_eq!(file.slice(f.default_assignment.unwrap()), "exports.default = foo");
    }

    #[test]
    fn test_define_property_marker() {
        let (_, f) = facts("Object.defineProperty(exports, \"__esModule\", { value: true });");
        assert!(f.es_module_marker);
    }

    #[test]
    fn test_assignment_values() {
        let (_, f) = facts(
            "function lib() {}\nlib.extra = 1;\nmodule.exports = lib;\nmodule.exports.default = lib;",
        );
        assert_eq!(f.assignments.len(), 1);
        assert_eq!(f.assignments[0].value, AssignedValue::Identifier("lib".into()));
        assert_eq!(f.assignments[0].scope, None);
        assert!(f.default_assignment.is_some());
        assert_eq!(f.properties_of("lib").collect::<Vec<_>>(), vec!["extra"]);

        let (_, f) = facts("module.exports = { a, b: 2 };");
        assert_eq!(f.assignments[0].value, AssignedValue::Object(vec!["a".into(), "b".into()]));

        let (_, f) = facts("module.exports = class Foo {};");
        assert_eq!(f.assignments[0].value, AssignedValue::Callable);
    }

    #[test]
    fn test_assignment_scopes() {
        let (_, f) = facts(
            "(function () {\n  if (a) { module.exports = x; }\n})();\nfunction g() { module.exports = y; }\n",
        );
        assert_eq!(f.assignments.len(), 2);
        assert_eq!(f.assignment_scopes(), 2);

        let (_, f) = facts("if (a) { module.exports = 1 } else { module.exports = 2 }");
        assert_eq!(f.assignment_scopes(), 1);
    }
}
