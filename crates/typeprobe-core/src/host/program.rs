//! Program construction and the bounded program cache.
//!
//! A program is the closure of files reachable from a set of roots through
//! imports that land on type-bearing files. Building one resolves (and
//! caches) every import on the way, which the internal-resolution check
//! later relies on.

use super::Host;
use crate::kinds::ResolutionOption;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::rc::Rc;

/// Programs kept per host.
pub(super) const PROGRAM_CACHE_CAPACITY: usize = 4;

/// Cache key: a blake3 hash of the option and the root set.
pub(super) fn program_key(option: ResolutionOption, roots: &[String]) -> String {
    typeprobe_util::hash::blake3_parts(
        std::iter::once(option.as_str()).chain(roots.iter().map(String::as_str)),
    )
}

/// Fixed-capacity cache evicting the least recently used entry.
/// Most recent entries live at the front.
pub(super) struct ProgramCache {
    capacity: usize,
    entries: VecDeque<(String, Rc<Vec<String>>)>,
}

impl ProgramCache {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub(super) fn get(&mut self, key: &str) -> Option<Rc<Vec<String>>> {
        let at = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(at)?;
        let files = Rc::clone(&entry.1);
        self.entries.push_front(entry);
        Some(files)
    }

    /// Insert a program; returns whether an older one was evicted.
    pub(super) fn insert(&mut self, key: String, files: Rc<Vec<String>>) -> bool {
        if let Some(at) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(at);
        }
        self.entries.push_front((key, files));
        if self.entries.len() > self.capacity {
            self.entries.pop_back();
            return true;
        }
        false
    }

    #[cfg(test)]
    fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Depth-first walk from `roots`. Missing roots are skipped.
pub(super) fn collect(host: &Host<'_>, roots: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    let mut visited = FxHashSet::default();
    let mut stack: Vec<String> = roots.iter().rev().cloned().collect();

    while let Some(file) = stack.pop() {
        if !visited.insert(file.clone()) {
            continue;
        }
        let Some(source) = host.get_source_file(&file) else {
            continue;
        };
        files.push(file.clone());

        let mut children = Vec::new();
        for reference in &source.references {
            let mode = host.mode_for_reference(&file, reference.kind);
            let outcome = host.resolve(&reference.specifier, &file, mode, false);
            if let Some(resolution) = outcome.resolution {
                if (resolution.is_typescript || resolution.is_json)
                    && !visited.contains(&resolution.file_name)
                {
                    children.push(resolution.file_name);
                }
            }
        }
        stack.extend(children.into_iter().rev());
    }
    files
}
