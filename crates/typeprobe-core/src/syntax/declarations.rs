//! Statement-level binder for declaration and source files.
//!
//! Records what a file declares at its top level and what it exports, with
//! enough meaning (value, type, callable, members) to answer the questions
//! the checks ask of the type-level view. It never looks inside function
//! bodies and never infers types.

use super::cursor::Cursor;
use super::lexer::{Span, TokenKind};
use rustc_hash::FxHashMap;

/// A top-level symbol, possibly merged from several declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbol {
    pub value: bool,
    pub is_type: bool,
    pub callable: bool,
    pub members: Vec<Member>,
    /// Named type of a `const x: T` declaration.
    pub type_ref: Option<String>,
}

impl Symbol {
    fn merge(&mut self, other: Symbol) {
        self.value |= other.value;
        self.is_type |= other.is_type;
        self.callable |= other.callable;
        for member in other.members {
            if !self.members.iter().any(|m| m.name == member.name) {
                self.members.push(member);
            }
        }
        if self.type_ref.is_none() {
            self.type_ref = other.type_ref;
        }
    }
}

/// A named member of a namespace, class, interface or object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub value: bool,
}

/// What an exported name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A local declaration or import binding.
    Local(String),
    /// `export { name } from "specifier"`.
    Import { specifier: String, name: String },
    /// `export * as x from "specifier"`.
    Namespace(String),
    /// `export default <expression>`.
    Expression { callable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub name: String,
    pub target: ExportTarget,
    pub type_only: bool,
    pub span: Span,
}

/// `export = target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEquals {
    /// Identifier being exported, when the expression is a plain name.
    pub target: Option<String>,
    pub callable: bool,
    pub span: Span,
}

/// A local name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub specifier: String,
    /// Imported name; `None` for namespace imports and `import x = require()`.
    pub name: Option<String>,
    pub type_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub exports: Vec<ExportEntry>,
    pub star_exports: Vec<String>,
    pub export_equals: Option<ExportEquals>,
    pub locals: FxHashMap<String, Symbol>,
    pub imports: FxHashMap<String, ImportBinding>,
    /// Whether any statement carried an `export` keyword.
    pub has_export_keyword: bool,
}

impl Declarations {
    #[must_use]
    pub fn export(&self, name: &str) -> Option<&ExportEntry> {
        self.exports.iter().find(|e| e.name == name)
    }
}

/// Bind the top-level statements of a file.
#[must_use]
pub fn bind(c: Cursor<'_>) -> Declarations {
    let mut binder = Binder {
        c,
        out: Declarations::default(),
    };
    binder.statements(0, c.len(), 0);
    binder.out
}

fn bind_block(c: Cursor<'_>, from: usize, to: usize, depth: u32) -> Declarations {
    let mut binder = Binder {
        c,
        out: Declarations::default(),
    };
    binder.statements(from, to, depth);
    binder.out
}

struct Binder<'a> {
    c: Cursor<'a>,
    out: Declarations,
}

impl<'a> Binder<'a> {
    fn statements(&mut self, from: usize, to: usize, depth: u32) {
        let mut i = from;
        while i < to {
            if self.c.depth(i) != depth || self.c.is(i, ";") {
                i += 1;
                continue;
            }
            let next = self.statement(i);
            i = next.max(i + 1);
        }
    }

    fn declare(&mut self, name: String, symbol: Symbol) {
        self.out
            .locals
            .entry(name)
            .and_modify(|s| s.merge(symbol.clone()))
            .or_insert(symbol);
    }

    fn push_export(&mut self, name: String, target: ExportTarget, type_only: bool, span: Span) {
        if self.out.exports.iter().any(|e| e.name == name) {
            return;
        }
        self.out.exports.push(ExportEntry {
            name,
            target,
            type_only,
            span,
        });
    }

    /// Bind one statement starting at `i`; returns the next statement index.
    fn statement(&mut self, i: usize) -> usize {
        let c = self.c;
        let end = c.statement_end(i);
        let next = c.next_statement(i);
        let span = c.span_of(i, end);
        let mut j = i;
        let mut exported = false;
        let mut is_default = false;

        if c.is(j, "export") {
            self.out.has_export_keyword = true;
            exported = true;
            j += 1;
            match c.text(j) {
                "=" => {
                    self.export_equals(j + 1, end, span);
                    return next;
                }
                "*" => {
                    self.export_star(j, end, span, false);
                    return next;
                }
                "{" => {
                    self.export_list(j, end, span, false);
                    return next;
                }
                "type" if c.is(j + 1, "{") => {
                    self.export_list(j + 1, end, span, true);
                    return next;
                }
                "type" if c.is(j + 1, "*") => {
                    self.export_star(j + 1, end, span, true);
                    return next;
                }
                "as" => return next,
                "import" => {
                    if c.is_ident(j + 1) {
                        let name = c.text(j + 1).to_string();
                        self.declare(
                            name.clone(),
                            Symbol {
                                value: true,
                                is_type: true,
                                ..Symbol::default()
                            },
                        );
                        self.push_export(name.clone(), ExportTarget::Local(name), false, span);
                    }
                    return next;
                }
                "default" => {
                    is_default = true;
                    j += 1;
                }
                _ => {}
            }
        }

        while matches!(c.text(j), "declare" | "abstract" | "async")
            || (c.is(j, "const") && c.is(j + 1, "enum"))
        {
            j += 1;
        }

        let declared = match c.text(j) {
            "function" => self.function(j, is_default),
            "class" => self.class(j, is_default),
            "interface" => self.interface(j),
            "type" if c.is_ident(j + 1) && matches!(c.text(j + 2), "=" | "<") => {
                self.type_alias(j)
            }
            "enum" => self.simple(j, Symbol {
                value: true,
                is_type: true,
                ..Symbol::default()
            }),
            "namespace" | "module" if c.is_ident(j + 1) => self.namespace(j),
            "const" | "let" | "var" | "using" => self.variables(j, end),
            "import" if !exported => {
                self.import(j, end);
                Vec::new()
            }
            _ if is_default => {
                self.export_default_expression(j, end, span);
                Vec::new()
            }
            _ => Vec::new(),
        };

        if exported {
            let is_type_only = |binder: &Self, name: &str| {
                binder
                    .out
                    .locals
                    .get(name)
                    .is_some_and(|s| !s.value && s.is_type)
            };
            for name in declared {
                let type_only = is_type_only(self, &name);
                let export_name = if is_default { "default".to_string() } else { name.clone() };
                self.push_export(export_name, ExportTarget::Local(name), type_only, span);
            }
        }
        next
    }

    fn simple(&mut self, j: usize, symbol: Symbol) -> Vec<String> {
        if !self.c.is_ident(j + 1) {
            return Vec::new();
        }
        let name = self.c.text(j + 1).to_string();
        self.declare(name.clone(), symbol);
        vec![name]
    }

    fn function(&mut self, j: usize, is_default: bool) -> Vec<String> {
        let c = self.c;
        let name_at = if c.is(j + 1, "*") { j + 2 } else { j + 1 };
        let name = if c.is_ident(name_at) {
            c.text(name_at).to_string()
        } else if is_default {
            "default".to_string()
        } else {
            return Vec::new();
        };
        self.declare(
            name.clone(),
            Symbol {
                value: true,
                callable: true,
                ..Symbol::default()
            },
        );
        vec![name]
    }

    fn class(&mut self, j: usize, is_default: bool) -> Vec<String> {
        let c = self.c;
        let name = if c.is_ident(j + 1) && !matches!(c.text(j + 1), "extends" | "implements") {
            c.text(j + 1).to_string()
        } else if is_default {
            "default".to_string()
        } else {
            return Vec::new();
        };
        let depth = c.depth(j);
        let end = c.statement_end(j);
        let members = c
            .find_at_depth(j + 1, end.max(j + 2), depth, "{")
            .map(|open| {
                block_members(c, open)
                    .into_iter()
                    .filter(|m| m.is_static)
                    .map(|m| Member {
                        name: m.name,
                        value: true,
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.declare(
            name.clone(),
            Symbol {
                value: true,
                is_type: true,
                callable: true,
                members,
                type_ref: None,
            },
        );
        vec![name]
    }

    fn interface(&mut self, j: usize) -> Vec<String> {
        let c = self.c;
        if !c.is_ident(j + 1) {
            return Vec::new();
        }
        let depth = c.depth(j);
        let end = c.statement_end(j);
        let members = c
            .find_at_depth(j + 2, end.max(j + 3), depth, "{")
            .map(|open| {
                block_members(c, open)
                    .into_iter()
                    .map(|m| Member {
                        name: m.name,
                        value: true,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let name = c.text(j + 1).to_string();
        self.declare(
            name.clone(),
            Symbol {
                is_type: true,
                members,
                ..Symbol::default()
            },
        );
        vec![name]
    }

    fn type_alias(&mut self, j: usize) -> Vec<String> {
        let c = self.c;
        let name = c.text(j + 1).to_string();
        let depth = c.depth(j);
        let end = c.statement_end(j);
        let members = c
            .find_at_depth(j + 2, end, depth, "=")
            .filter(|eq| c.is(eq + 1, "{"))
            .map(|eq| {
                block_members(c, eq + 1)
                    .into_iter()
                    .map(|m| Member {
                        name: m.name,
                        value: true,
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.declare(
            name.clone(),
            Symbol {
                is_type: true,
                members,
                ..Symbol::default()
            },
        );
        vec![name]
    }

    fn namespace(&mut self, j: usize) -> Vec<String> {
        let c = self.c;
        let name = c.text(j + 1).to_string();
        let depth = c.depth(j);
        let end = c.statement_end(j);
        let Some(open) = c.find_at_depth(j + 2, end.max(j + 3), depth, "{") else {
            return Vec::new();
        };
        let close = c.matching_close(open).unwrap_or(c.len());
        let inner = bind_block(c, open + 1, close, depth + 1);

        // Without any explicit `export`, every member of an ambient namespace is exported.
        let exported: Vec<(String, bool)> = if inner.has_export_keyword {
            inner
                .exports
                .iter()
                .map(|e| {
                    let value = match &e.target {
                        ExportTarget::Local(local) => {
                            inner.locals.get(local).map_or(!e.type_only, |s| s.value)
                        }
                        _ => !e.type_only,
                    };
                    (e.name.clone(), value)
                })
                .collect()
        } else {
            let mut names: Vec<(String, bool)> = inner
                .locals
                .iter()
                .map(|(name, s)| (name.clone(), s.value))
                .collect();
            names.sort();
            names
        };

        let instantiated = exported.iter().any(|(_, value)| *value)
            || inner.locals.values().any(|s| s.value);
        self.declare(
            name.clone(),
            Symbol {
                value: instantiated,
                is_type: true,
                callable: false,
                members: exported
                    .into_iter()
                    .map(|(name, value)| Member { name, value })
                    .collect(),
                type_ref: None,
            },
        );
        vec![name]
    }

    fn variables(&mut self, j: usize, end: usize) -> Vec<String> {
        let c = self.c;
        let depth = c.depth(j);
        let mut names = Vec::new();
        let mut k = j + 1;
        while k < end {
            let declarator_end = (k..end)
                .find(|&x| c.depth(x) == depth && c.is(x, ","))
                .unwrap_or(end);

            if c.is_ident(k) {
                let name = c.text(k).to_string();
                let symbol = declarator_symbol(c, k + 1, declarator_end);
                self.declare(name.clone(), symbol);
                names.push(name);
            } else if matches!(c.text(k), "{" | "[") {
                for name in binding_names(c, k) {
                    self.declare(
                        name.clone(),
                        Symbol {
                            value: true,
                            ..Symbol::default()
                        },
                    );
                    names.push(name);
                }
            }
            k = declarator_end + 1;
        }
        names
    }

    fn import(&mut self, j: usize, end: usize) {
        let c = self.c;
        let depth = c.depth(j);
        let mut k = j + 1;
        let mut type_only = false;
        if c.is(k, "type") && !matches!(c.text(k + 1), "from" | "," | "=") {
            type_only = true;
            k += 1;
        }

        // import x = require("y") / import x = A.B
        if c.is_ident(k) && c.is(k + 1, "=") {
            let local = c.text(k).to_string();
            if c.is(k + 2, "require") {
                if let Some(specifier) = c.string_value(k + 4) {
                    self.out.imports.insert(
                        local,
                        ImportBinding {
                            specifier,
                            name: None,
                            type_only,
                        },
                    );
                }
            } else {
                self.declare(
                    local,
                    Symbol {
                        value: true,
                        is_type: true,
                        ..Symbol::default()
                    },
                );
            }
            return;
        }

        let Some(from) = c.find_at_depth(k, end, depth, "from") else {
            return;
        };
        let Some(specifier) = c.string_value(from + 1) else {
            return;
        };

        while k < from {
            match c.text(k) {
                "{" => {
                    let close = c.matching_close(k).unwrap_or(from);
                    for (imported, local, element_type_only) in specifier_list(c, k, close) {
                        self.out.imports.insert(
                            local,
                            ImportBinding {
                                specifier: specifier.clone(),
                                name: Some(imported),
                                type_only: type_only || element_type_only,
                            },
                        );
                    }
                    k = close + 1;
                }
                "*" if c.is(k + 1, "as") => {
                    self.out.imports.insert(
                        c.text(k + 2).to_string(),
                        ImportBinding {
                            specifier: specifier.clone(),
                            name: None,
                            type_only,
                        },
                    );
                    k += 3;
                }
                "," => k += 1,
                _ if c.is_ident(k) => {
                    self.out.imports.insert(
                        c.text(k).to_string(),
                        ImportBinding {
                            specifier: specifier.clone(),
                            name: Some("default".to_string()),
                            type_only,
                        },
                    );
                    k += 1;
                }
                _ => k += 1,
            }
        }
    }

    fn export_equals(&mut self, from: usize, end: usize, span: Span) {
        let c = self.c;
        let target = (end == from + 1 && c.is_ident(from)).then(|| c.text(from).to_string());
        self.out.has_export_keyword = true;
        self.out.export_equals = Some(ExportEquals {
            target,
            callable: expression_is_callable(c, from, end),
            span,
        });
    }

    fn export_default_expression(&mut self, from: usize, end: usize, span: Span) {
        let c = self.c;
        let target = if end == from + 1 && c.is_ident(from) {
            ExportTarget::Local(c.text(from).to_string())
        } else {
            ExportTarget::Expression {
                callable: expression_is_callable(c, from, end),
            }
        };
        self.push_export("default".to_string(), target, false, span);
    }

    fn export_star(&mut self, star: usize, end: usize, span: Span, type_only: bool) {
        let c = self.c;
        let Some(from) = c.find_at_depth(star, end, c.depth(star), "from") else {
            return;
        };
        let Some(specifier) = c.string_value(from + 1) else {
            return;
        };
        if c.is(star + 1, "as") {
            if let Some(name) = c.property_name(star + 2) {
                self.push_export(name, ExportTarget::Namespace(specifier), type_only, span);
            }
        } else if !type_only {
            self.out.star_exports.push(specifier);
        }
    }

    fn export_list(&mut self, open: usize, end: usize, span: Span, type_only: bool) {
        let c = self.c;
        let close = c.matching_close(open).unwrap_or(end);
        let specifier = if c.is(close + 1, "from") {
            c.string_value(close + 2)
        } else {
            None
        };
        for (local, exported, element_type_only) in specifier_list(c, open, close) {
            let target = match &specifier {
                Some(specifier) => ExportTarget::Import {
                    specifier: specifier.clone(),
                    name: local,
                },
                None => ExportTarget::Local(local),
            };
            self.push_export(exported, target, type_only || element_type_only, span);
        }
    }
}

/// Elements of `{ a, b as c, type d }` as `(name, alias, type_only)`.
pub(crate) fn specifier_list(c: Cursor<'_>, open: usize, close: usize) -> Vec<(String, String, bool)> {
    let depth = c.depth(open) + 1;
    let mut out = Vec::new();
    let mut k = open + 1;
    while k < close {
        let element_end = (k..close)
            .find(|&x| c.depth(x) == depth && c.is(x, ","))
            .unwrap_or(close);
        let mut m = k;
        let mut type_only = false;
        if c.is(m, "type") && m + 1 < element_end && !c.is(m + 1, "as") {
            type_only = true;
            m += 1;
        }
        if let Some(name) = c.property_name(m) {
            let alias = if c.is(m + 1, "as") {
                c.property_name(m + 2).unwrap_or_else(|| name.clone())
            } else {
                name.clone()
            };
            out.push((name, alias, type_only));
        }
        k = element_end + 1;
    }
    out
}

/// Symbol for `name [: Type] [= init]` spanning `[from, to)` after the name.
fn declarator_symbol(c: Cursor<'_>, from: usize, to: usize) -> Symbol {
    let mut symbol = Symbol {
        value: true,
        ..Symbol::default()
    };
    let mut k = from;
    if c.is(k, "!") {
        k += 1;
    }
    if c.is(k, ":") {
        let type_start = k + 1;
        let depth = c.depth(k);
        let type_end = c.find_at_depth(type_start, to, depth, "=").unwrap_or(to);
        match c.text(type_start) {
            "{" => {
                symbol.members = block_members(c, type_start)
                    .into_iter()
                    .map(|m| Member {
                        name: m.name,
                        value: true,
                    })
                    .collect();
                symbol.callable = block_members_has_call_signature(c, type_start);
            }
            "(" | "new" | "<" => {
                symbol.callable = c.find_at_depth(type_start, type_end, depth, "=>").is_some();
            }
            "typeof" => {
                symbol.type_ref = Some(format!("typeof {}", c.text(type_start + 1)));
            }
            _ if c.is_ident(type_start) => {
                symbol.type_ref = Some(c.text(type_start).to_string());
            }
            _ => {}
        }
        k = type_end;
    }
    if c.is(k, "=") {
        symbol.callable |= expression_is_callable(c, k + 1, to);
        if c.is(k + 1, "{") {
            symbol.members = block_members(c, k + 1)
                .into_iter()
                .map(|m| Member {
                    name: m.name,
                    value: true,
                })
                .collect();
        }
    }
    symbol
}

/// Whether the expression in `[from, to)` is a function or class.
pub(crate) fn expression_is_callable(c: Cursor<'_>, from: usize, to: usize) -> bool {
    let mut k = from;
    if c.is(k, "async") {
        k += 1;
    }
    match c.text(k) {
        "function" | "class" => true,
        "(" => c
            .matching_close(k)
            .is_some_and(|close| close + 1 < to && c.is(close + 1, "=>")),
        _ => c.is_ident(k) && c.is(k + 1, "=>"),
    }
}

pub(crate) struct BlockMember {
    pub name: String,
    pub is_static: bool,
}

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "readonly", "abstract", "declare", "override", "async",
    "get", "set", "accessor",
];

/// Named members of the class body, interface body or object literal/type at `open`.
pub(crate) fn block_members(c: Cursor<'_>, open: usize) -> Vec<BlockMember> {
    let Some(close) = c.matching_close(open) else {
        return Vec::new();
    };
    let depth = c.depth(open) + 1;
    let mut out: Vec<BlockMember> = Vec::new();
    let mut at_start = true;
    let mut k = open + 1;
    while k < close {
        if c.depth(k) != depth {
            k += 1;
            continue;
        }
        let text = c.text(k);
        if matches!(text, ";" | ",") {
            at_start = true;
            k += 1;
            continue;
        }
        if text == "}" {
            at_start = true;
            k += 1;
            continue;
        }
        if !at_start {
            if c.tokens[k].newline_before && c.kind(k) == Some(TokenKind::Ident) && ends_member(c, k - 1) {
                at_start = true;
            } else {
                k += 1;
                continue;
            }
        }

        let mut m = k;
        let mut is_static = false;
        loop {
            let next_is_name = c.property_name(m + 1).is_some() || c.is(m + 1, "[") || c.is(m + 1, "*");
            if c.is(m, "static") && next_is_name {
                is_static = true;
                m += 1;
            } else if MEMBER_MODIFIERS.contains(&c.text(m)) && next_is_name {
                m += 1;
            } else {
                break;
            }
        }
        if c.is(m, "*") {
            m += 1;
        }
        if c.is(m, "...") {
            // spread in an object literal: no static name
        } else if let Some(name) = c.property_name(m) {
            if !name.starts_with('#') && !out.iter().any(|o| o.name == name && o.is_static == is_static) {
                out.push(BlockMember { name, is_static });
            }
        }
        at_start = false;
        k = m + 1;
    }
    out
}

fn ends_member(c: Cursor<'_>, i: usize) -> bool {
    match c.kind(i) {
        Some(TokenKind::Punct) => matches!(c.text(i), ")" | "]" | "}" | ">"),
        Some(_) => true,
        None => false,
    }
}

/// Whether an object type literal has a call or construct signature.
fn block_members_has_call_signature(c: Cursor<'_>, open: usize) -> bool {
    let depth = c.depth(open) + 1;
    let Some(close) = c.matching_close(open) else {
        return false;
    };
    (open + 1..close).any(|k| {
        c.depth(k) == depth
            && (c.is(k, "(") || (c.is(k, "new") && c.is(k + 1, "(")))
            && matches!(c.text(k - 1), "{" | ";" | "," | "new")
    })
}

/// Leaf names bound by the destructuring pattern opened at `open`.
pub(crate) fn binding_names(c: Cursor<'_>, open: usize) -> Vec<String> {
    let Some(close) = c.matching_close(open) else {
        return Vec::new();
    };
    let depth = c.depth(open) + 1;
    let object = c.is(open, "{");
    let mut out = Vec::new();
    let mut k = open + 1;
    while k < close {
        let element_end = (k..close)
            .find(|&x| c.depth(x) == depth && c.is(x, ","))
            .unwrap_or(close);
        let mut m = k;
        if c.is(m, "...") {
            m += 1;
        }
        if object && m + 1 < element_end && c.is(m + 1, ":") {
            m += 2;
        } else if object && c.is(m, "[") {
            // computed key: `[k]: value`
            let after = c.skip_group(m);
            m = if c.is(after, ":") { after + 1 } else { after };
        }
        if matches!(c.text(m), "{" | "[") && m < element_end {
            out.extend(binding_names(c, m));
        } else if c.is_ident(m) && m < element_end {
            out.push(c.text(m).to_string());
        }
        k = element_end + 1;
    }
    out
}
