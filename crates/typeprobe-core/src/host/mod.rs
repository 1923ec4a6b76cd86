//! Resolution hosts.
//!
//! One [`Host`] per [`ResolutionOption`]. A host parses files of the virtual
//! package on demand, resolves specifiers under its algorithm, detects
//! module kinds and enumerates the files a type-level entry pulls in.
//! Every answer is cached with insert-if-absent semantics, so repeated
//! queries across the matrix are cheap and always agree.

pub mod exports;
mod module_kind;
mod program;
mod resolve;
mod symbols;
pub mod trace;

pub use symbols::ModuleSymbols;

use crate::error::{Error, Result};
use crate::kinds::{ModuleKindRecord, Resolution, ResolutionMode, ResolutionOption};
use crate::package::{Package, PackageFs, PackageJson};
use crate::syntax::{ReferenceKind, SourceFile};
use program::ProgramCache;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use typeprobe_util::vpath;

/// Result of one resolution call: the file, if any, and the decisions made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub resolution: Option<Resolution>,
    pub trace: Vec<String>,
}

/// Cache key for a resolution, scoped to its containing file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    mode: ResolutionMode,
    no_dts: bool,
    allow_js: bool,
    specifier: String,
}

type ResolutionCache = FxHashMap<String, FxHashMap<ResolutionKey, ResolveOutcome>>;

/// A resolution host for one algorithm over one package.
pub struct Host<'p> {
    package: &'p Package,
    option: ResolutionOption,
    source_files: RefCell<FxHashMap<String, Option<Rc<SourceFile>>>>,
    resolutions: RefCell<ResolutionCache>,
    impl_resolutions: RefCell<ResolutionCache>,
    module_kinds: RefCell<FxHashMap<String, ModuleKindRecord>>,
    manifests: RefCell<FxHashMap<String, Option<Rc<PackageJson>>>>,
    programs: RefCell<ProgramCache>,
}

impl<'p> Host<'p> {
    #[must_use]
    pub fn new(package: &'p Package, option: ResolutionOption) -> Self {
        Self {
            package,
            option,
            source_files: RefCell::default(),
            resolutions: RefCell::default(),
            impl_resolutions: RefCell::default(),
            module_kinds: RefCell::default(),
            manifests: RefCell::default(),
            programs: RefCell::new(ProgramCache::new(program::PROGRAM_CACHE_CAPACITY)),
        }
    }

    #[must_use]
    pub fn option(&self) -> ResolutionOption {
        self.option
    }

    #[must_use]
    pub fn package(&self) -> &'p Package {
        self.package
    }

    /// Parse a file of the package, once.
    pub fn get_source_file(&self, file_name: &str) -> Option<Rc<SourceFile>> {
        if let Some(cached) = self.source_files.borrow().get(file_name) {
            return cached.clone();
        }
        let parsed = self
            .package
            .read_file(file_name)
            .map(|text| Rc::new(SourceFile::parse(file_name, text)));
        self.source_files
            .borrow_mut()
            .entry(file_name.to_string())
            .or_insert(parsed)
            .clone()
    }

    /// Resolve `specifier` from `from_file`.
    ///
    /// With `no_dts` only implementation files (JavaScript, JSON) are
    /// considered. Failure to resolve is an ordinary outcome.
    pub fn resolve(
        &self,
        specifier: &str,
        from_file: &str,
        mode: ResolutionMode,
        no_dts: bool,
    ) -> ResolveOutcome {
        let key = ResolutionKey {
            mode,
            no_dts,
            allow_js: true,
            specifier: specifier.to_string(),
        };
        let cache = if no_dts {
            &self.impl_resolutions
        } else {
            &self.resolutions
        };
        if let Some(hit) = cache.borrow().get(from_file).and_then(|m| m.get(&key)) {
            return hit.clone();
        }

        let outcome = resolve::resolve_module(self, specifier, from_file, mode, no_dts);
        tracing::trace!(
            option = %self.option,
            specifier,
            from_file,
            mode = mode.as_str(),
            no_dts,
            resolved = outcome.resolution.as_ref().map(|r| r.file_name.as_str()),
            "resolved module"
        );
        cache
            .borrow_mut()
            .entry(from_file.to_string())
            .or_default()
            .entry(key)
            .or_insert(outcome)
            .clone()
    }

    /// The resolution recorded when `from_file`'s imports were enumerated.
    ///
    /// A miss means the file was never part of a built program, which the
    /// engine never allows.
    pub fn cached_resolution(
        &self,
        from_file: &str,
        specifier: &str,
        mode: ResolutionMode,
    ) -> Result<ResolveOutcome> {
        let key = ResolutionKey {
            mode,
            no_dts: false,
            allow_js: true,
            specifier: specifier.to_string(),
        };
        self.resolutions
            .borrow()
            .get(from_file)
            .and_then(|m| m.get(&key))
            .cloned()
            .ok_or_else(|| {
                Error::invariant(format!(
                    "no cached {} resolution of '{specifier}' from {from_file}",
                    self.option
                ))
            })
    }

    /// The resolution mode an import of `kind` in `file` uses.
    #[must_use]
    pub fn mode_for_reference(&self, file: &str, kind: ReferenceKind) -> ResolutionMode {
        match self.option {
            ResolutionOption::Classic => ResolutionMode::Require,
            ResolutionOption::Dual => match kind {
                ReferenceKind::Require | ReferenceKind::ImportEquals => ResolutionMode::Require,
                ReferenceKind::DynamicImport => ResolutionMode::Import,
                ReferenceKind::ImportDeclaration
                | ReferenceKind::ExportFrom
                | ReferenceKind::ImportType => match self.module_kind_for_file(file).detected_kind {
                    crate::kinds::ModuleKind::Esm => ResolutionMode::Import,
                    crate::kinds::ModuleKind::Cjs => ResolutionMode::Require,
                },
            },
            ResolutionOption::Bundler => match kind {
                ReferenceKind::Require | ReferenceKind::ImportEquals => ResolutionMode::Require,
                _ => ResolutionMode::Import,
            },
        }
    }

    /// Detected module kind of `file`, computed once.
    pub fn module_kind_for_file(&self, file: &str) -> ModuleKindRecord {
        if let Some(record) = self.module_kinds.borrow().get(file) {
            return record.clone();
        }
        let record = module_kind::detect(self, file);
        self.module_kinds
            .borrow_mut()
            .entry(file.to_string())
            .or_insert(record)
            .clone()
    }

    /// Every module kind detected so far, sorted by file name.
    #[must_use]
    pub fn module_kinds(&self) -> BTreeMap<String, ModuleKindRecord> {
        self.module_kinds
            .borrow()
            .iter()
            .map(|(file, record)| (file.clone(), record.clone()))
            .collect()
    }

    /// Files reachable from `roots` through type-level imports, roots first,
    /// depth-first. Every import met on the way is resolved and cached.
    pub fn build_program_from(&self, roots: &[String]) -> Vec<String> {
        let key = program::program_key(self.option, roots);
        if let Some(files) = self.programs.borrow_mut().get(&key) {
            return files.as_ref().clone();
        }
        let files = Rc::new(program::collect(self, roots));
        let evicted = self.programs.borrow_mut().insert(key, Rc::clone(&files));
        if evicted {
            tracing::debug!(option = %self.option, "evicted least recently used program");
        }
        files.as_ref().clone()
    }

    /// Parsed manifest at `<dir>/package.json`. Malformed manifests are
    /// treated as absent.
    pub(crate) fn manifest(&self, dir: &str) -> Option<Rc<PackageJson>> {
        if let Some(cached) = self.manifests.borrow().get(dir) {
            return cached.clone();
        }
        let parsed = match self.package.manifest_at(dir) {
            Ok(manifest) => manifest.map(Rc::new),
            Err(err) => {
                tracing::debug!(dir, error = %err, "ignoring unreadable package.json");
                None
            }
        };
        self.manifests
            .borrow_mut()
            .entry(dir.to_string())
            .or_insert(parsed)
            .clone()
    }

    /// Nearest directory at or above `dir` holding a `package.json`.
    pub(crate) fn nearest_manifest(&self, dir: &str) -> Option<(String, Rc<PackageJson>)> {
        vpath::ancestors(dir)
            .into_iter()
            .find_map(|ancestor| self.manifest(ancestor).map(|m| (ancestor.to_string(), m)))
    }

    /// The exported symbol view of a module, following re-exports.
    pub fn module_symbols(&self, file: &str) -> ModuleSymbols {
        symbols::module_symbols(self, file)
    }
}

impl std::fmt::Debug for Host<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("package", &self.package.name())
            .field("option", &self.option)
            .finish_non_exhaustive()
    }
}

/// One host per resolution option, sharing a package.
#[derive(Debug)]
pub struct HostSet<'p> {
    classic: Host<'p>,
    dual: Host<'p>,
    bundler: Host<'p>,
}

impl<'p> HostSet<'p> {
    #[must_use]
    pub fn new(package: &'p Package) -> Self {
        Self {
            classic: Host::new(package, ResolutionOption::Classic),
            dual: Host::new(package, ResolutionOption::Dual),
            bundler: Host::new(package, ResolutionOption::Bundler),
        }
    }

    #[must_use]
    pub fn get(&self, option: ResolutionOption) -> &Host<'p> {
        match option {
            ResolutionOption::Classic => &self.classic,
            ResolutionOption::Dual => &self.dual,
            ResolutionOption::Bundler => &self.bundler,
        }
    }

    #[must_use]
    pub fn package(&self) -> &'p Package {
        self.classic.package
    }
}
