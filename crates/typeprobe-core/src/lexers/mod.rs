//! Runtime export lexers.
//!
//! Two independent extractors of the names a module exports at runtime,
//! one per module system. Both are conservative: syntax they do not
//! recognize contributes nothing.

pub mod cjs;
pub mod esm;

use rustc_hash::FxHashSet;

/// Names a module exports directly plus the specifiers it re-exports wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleExports {
    pub exported_names: Vec<String>,
    pub reexported_specifiers: Vec<String>,
}

impl ModuleExports {
    pub(crate) fn add_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.exported_names.contains(&name) {
            self.exported_names.push(name);
        }
    }

    pub(crate) fn add_reexport(&mut self, specifier: impl Into<String>) {
        let specifier = specifier.into();
        if !self.reexported_specifiers.contains(&specifier) {
            self.reexported_specifiers.push(specifier);
        }
    }

    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.exported_names.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exported_names.is_empty() && self.reexported_specifiers.is_empty()
    }
}

/// Append `names` to `into`, skipping ones already present.
pub(crate) fn union_into(into: &mut Vec<String>, seen: &mut FxHashSet<String>, names: impl IntoIterator<Item = String>) {
    for name in names {
        if seen.insert(name.clone()) {
            into.push(name);
        }
    }
}
