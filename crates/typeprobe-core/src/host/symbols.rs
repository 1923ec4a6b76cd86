//! The exported-symbol view of a module, as the type checker sees it.

use super::Host;
use crate::syntax::{ExportTarget, ReferenceKind};
use rustc_hash::FxHashSet;

/// One exported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSymbol {
    pub name: String,
    /// Has a runtime (value) meaning.
    pub value: bool,
    pub callable: bool,
}

/// Exports of a module with re-exports followed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSymbols {
    pub exports: Vec<ExportedSymbol>,
    /// The `export =` target, when the module uses one. Its members are
    /// what `exports` lists.
    pub export_equals: Option<ExportedSymbol>,
}

impl ModuleSymbols {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExportedSymbol> {
        self.exports.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.get("default").is_some()
    }

    /// Names with a value meaning, in declaration order.
    pub fn value_names(&self) -> impl Iterator<Item = &str> {
        self.exports
            .iter()
            .filter(|s| s.value)
            .map(|s| s.name.as_str())
    }
}

pub(super) fn module_symbols(host: &Host<'_>, file: &str) -> ModuleSymbols {
    let mut visited = FxHashSet::default();
    collect(host, file, &mut visited)
}

fn collect(host: &Host<'_>, file: &str, visited: &mut FxHashSet<String>) -> ModuleSymbols {
    let mut out = ModuleSymbols::default();
    if !visited.insert(file.to_string()) {
        return out;
    }
    let Some(source) = host.get_source_file(file) else {
        return out;
    };
    let decls = source.declarations();

    if let Some(eq) = &decls.export_equals {
        let target = eq.target.as_deref().and_then(|t| decls.locals.get(t));
        out.export_equals = Some(ExportedSymbol {
            name: "export=".to_string(),
            value: true,
            callable: eq.callable || target.is_some_and(|s| s.callable),
        });
        if let Some(symbol) = target {
            out.exports = symbol
                .members
                .iter()
                .map(|m| ExportedSymbol {
                    name: m.name.clone(),
                    value: m.value,
                    callable: false,
                })
                .collect();
        }
        return out;
    }

    let mut seen: FxHashSet<String> = FxHashSet::default();
    for entry in &decls.exports {
        if !seen.insert(entry.name.clone()) {
            continue;
        }
        let (value, callable) = if entry.type_only {
            (false, false)
        } else {
            match &entry.target {
                ExportTarget::Local(local) => match decls.locals.get(local) {
                    Some(symbol) => (symbol.value, symbol.callable),
                    None => match decls.imports.get(local) {
                        Some(binding) if !binding.type_only => {
                            imported_meaning(host, file, &binding.specifier, binding.name.as_deref(), visited)
                        }
                        _ => (false, false),
                    },
                },
                ExportTarget::Import { specifier, name } => {
                    imported_meaning(host, file, specifier, Some(name), visited)
                }
                ExportTarget::Namespace(specifier) => {
                    (resolve_from(host, file, specifier).is_some(), false)
                }
                ExportTarget::Expression { callable } => (true, *callable),
            }
        };
        out.exports.push(ExportedSymbol {
            name: entry.name.clone(),
            value,
            callable,
        });
    }

    for specifier in &decls.star_exports {
        let Some(target) = resolve_from(host, file, specifier) else {
            continue;
        };
        let nested = collect(host, &target, visited);
        for symbol in nested.exports {
            if symbol.name != "default" && seen.insert(symbol.name.clone()) {
                out.exports.push(symbol);
            }
        }
    }
    out
}

/// Value meaning of `name` imported from `specifier`; `None` is a namespace
/// import. Unresolvable imports count as types only.
fn imported_meaning(
    host: &Host<'_>,
    file: &str,
    specifier: &str,
    name: Option<&str>,
    visited: &mut FxHashSet<String>,
) -> (bool, bool) {
    let Some(target) = resolve_from(host, file, specifier) else {
        return (false, false);
    };
    let Some(name) = name else {
        return (true, false);
    };
    // A module reached twice along one chain contributes nothing new.
    let mut branch = visited.clone();
    let nested = collect(host, &target, &mut branch);
    if name == "default" {
        if let Some(eq) = &nested.export_equals {
            return (eq.value, eq.callable);
        }
    }
    nested
        .get(name)
        .map_or((false, false), |s| (s.value, s.callable))
}

fn resolve_from(host: &Host<'_>, file: &str, specifier: &str) -> Option<String> {
    let mode = host.mode_for_reference(file, ReferenceKind::ExportFrom);
    host.resolve(specifier, file, mode, false)
        .resolution
        .filter(|r| r.is_typescript)
        .map(|r| r.file_name)
}
