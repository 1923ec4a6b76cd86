//! Runtime module namespaces.
//!
//! Re-derives the names a module really exposes when imported under Node:
//! specifiers are resolved with Node's loader rules over `file:///` URLs into
//! the virtual package, the target is lexed according to its format and
//! re-exports are chased. Every URL is visited at most once per call, which
//! also breaks re-export cycles.

use crate::error::{Error, Result};
use crate::host::exports::{exports_entry, match_key, resolve_target, Conditions};
use crate::host::trace::ResolveTrace;
use crate::kinds::ResolutionMode;
use crate::lexers::{cjs, esm, union_into};
use crate::package::{PackageFs, PackageJson};
use percent_encoding::percent_decode_str;
use rustc_hash::FxHashSet;
use typeprobe_util::vpath;
use url::Url;

/// Format Node assigns a resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Esm,
    Cjs,
    Json,
    Unknown,
}

/// Names obtainable by importing `specifier` from `from`.
///
/// Fails when `specifier`, or anything it re-exports, cannot be resolved.
pub fn resolve_namespace<F>(fs: &F, specifier: &str, from: &Url) -> Result<Vec<String>>
where
    F: PackageFs + ?Sized,
{
    NamespaceResolver::new(fs).namespace(specifier, from, ResolutionMode::Import)
}

/// The `file:///` URL of a virtual path.
pub fn file_url(path: &str) -> Result<Url> {
    Url::parse("file:///")
        .and_then(|root| root.join(path))
        .map_err(|e| Error::other(format!("invalid module path {path}: {e}")))
}

struct NamespaceResolver<'f, F: ?Sized> {
    fs: &'f F,
    seen: FxHashSet<String>,
}

impl<'f, F> NamespaceResolver<'f, F>
where
    F: PackageFs + ?Sized,
{
    fn new(fs: &'f F) -> Self {
        Self {
            fs,
            seen: FxHashSet::default(),
        }
    }

    fn namespace(&mut self, specifier: &str, from: &Url, mode: ResolutionMode) -> Result<Vec<String>> {
        let url = self.resolve(specifier, from, mode)?;
        if !self.seen.insert(url.as_str().to_string()) {
            return Ok(Vec::new());
        }
        let path = url_path(&url);
        match self.format(&path) {
            Format::Cjs => self.cjs_names(&url, &path),
            Format::Esm => self.esm_names(&url, &path),
            Format::Json | Format::Unknown => Ok(vec!["default".to_string()]),
        }
    }

    /// A CommonJS module: its lexed names plus the synthetic default, merged
    /// with re-exports that are CommonJS themselves.
    fn cjs_names(&mut self, url: &Url, path: &str) -> Result<Vec<String>> {
        let lexed = cjs::lex(self.source(path)?);
        let mut names = Vec::new();
        let mut seen_names = FxHashSet::default();
        union_into(&mut names, &mut seen_names, lexed.exported_names);
        union_into(&mut names, &mut seen_names, ["default".to_string()]);

        for specifier in &lexed.reexported_specifiers {
            // An unresolvable `require` is treated like any non-CommonJS target.
            let Ok(target) = self.resolve(specifier, url, ResolutionMode::Require) else {
                tracing::debug!(specifier = specifier.as_str(), from = %url, "skipping unresolved re-export");
                continue;
            };
            let target_path = url_path(&target);
            if self.format(&target_path) != Format::Cjs {
                continue;
            }
            if !self.seen.insert(target.as_str().to_string()) {
                continue;
            }
            let nested = self.cjs_names(&target, &target_path)?;
            union_into(&mut names, &mut seen_names, nested);
        }
        Ok(names)
    }

    /// An ES module: its own names plus every star re-export's names, where a
    /// star re-export never carries `default`.
    fn esm_names(&mut self, url: &Url, path: &str) -> Result<Vec<String>> {
        let lexed = esm::lex(self.source(path)?);
        let mut names = Vec::new();
        let mut seen_names = FxHashSet::default();
        union_into(&mut names, &mut seen_names, lexed.exported_names);

        for specifier in &lexed.reexported_specifiers {
            let indirect = self.namespace(specifier, url, ResolutionMode::Import)?;
            union_into(
                &mut names,
                &mut seen_names,
                indirect.into_iter().filter(|name| name != "default"),
            );
        }
        Ok(names)
    }

    fn source(&self, path: &str) -> Result<&'f str> {
        self.fs
            .read_file(path)
            .ok_or_else(|| Error::MissingFile(path.to_string()))
    }

    fn format(&self, path: &str) -> Format {
        if path.ends_with(".mjs") {
            Format::Esm
        } else if path.ends_with(".cjs") {
            Format::Cjs
        } else if path.ends_with(".json") {
            Format::Json
        } else if path.ends_with(".js") {
            if self.nearest_manifest(vpath::dirname(path)).is_some_and(|(_, m)| m.is_module_type()) {
                Format::Esm
            } else {
                Format::Cjs
            }
        } else {
            Format::Unknown
        }
    }

    fn resolve(&self, specifier: &str, from: &Url, mode: ResolutionMode) -> Result<Url> {
        let from_path = url_path(from);
        let dir = if from_path.ends_with('/') {
            from_path.trim_end_matches('/').to_string()
        } else {
            vpath::dirname(&from_path).to_string()
        };

        let resolved = if specifier.starts_with('/') || vpath::is_relative_specifier(specifier) {
            self.load_path(&vpath::join(&dir, specifier), mode)
        } else if specifier.starts_with('#') {
            self.resolve_import_map(specifier, &dir, mode)
        } else {
            self.resolve_package(specifier, &dir, mode)
        };

        match resolved {
            Some(path) => file_url(&path),
            None => Err(Error::Namespace {
                specifier: specifier.to_string(),
                from: from.to_string(),
            }),
        }
    }

    /// `require` probes extensions and directories; `import` wants the exact file.
    fn load_path(&self, path: &str, mode: ResolutionMode) -> Option<String> {
        if mode == ResolutionMode::Import {
            return self.fs.file_exists(path).then(|| path.to_string());
        }
        self.load_as_file(path).or_else(|| self.load_as_directory(path))
    }

    fn load_as_file(&self, path: &str) -> Option<String> {
        ["", ".js", ".json", ".node"]
            .iter()
            .map(|ext| format!("{path}{ext}"))
            .find(|candidate| self.fs.file_exists(candidate))
    }

    fn load_as_directory(&self, dir: &str) -> Option<String> {
        if let Some(main) = self.manifest(dir).and_then(|m| m.main().map(str::to_string)) {
            let main_path = vpath::join(dir, &main);
            if let Some(found) = self
                .load_as_file(&main_path)
                .or_else(|| self.load_index(&main_path))
            {
                return Some(found);
            }
        }
        self.load_index(dir)
    }

    fn load_index(&self, dir: &str) -> Option<String> {
        ["index.js", "index.json", "index.node"]
            .iter()
            .map(|name| vpath::join(dir, name))
            .find(|candidate| self.fs.file_exists(candidate))
    }

    fn resolve_package(&self, specifier: &str, dir: &str, mode: ResolutionMode) -> Option<String> {
        let (name, subpath) = split_package_specifier(specifier)?;
        for ancestor in vpath::ancestors(dir) {
            if vpath::basename(ancestor) == "node_modules" {
                continue;
            }
            let package_dir = vpath::join(ancestor, &format!("node_modules/{name}"));
            if !self.fs.directory_exists(&package_dir) {
                continue;
            }
            let manifest = self.manifest(&package_dir);
            if let Some(exports) = manifest.as_ref().and_then(|m| m.exports.as_ref()) {
                let (target, star) = exports_entry(exports, &subpath)?;
                return self.resolve_in_package(target, star.as_deref(), &package_dir, mode);
            }
            if subpath == "." {
                return self.load_as_directory(&package_dir);
            }
            return self.load_path(&vpath::join(&package_dir, &subpath), ResolutionMode::Require);
        }
        None
    }

    fn resolve_import_map(&self, specifier: &str, dir: &str, mode: ResolutionMode) -> Option<String> {
        let (package_dir, manifest) = self.nearest_manifest(dir)?;
        let imports = manifest.imports.as_ref()?.as_object()?;
        let (target, star) = match_key(imports, specifier)?;
        self.resolve_in_package(target, star.as_deref(), &package_dir, mode)
    }

    fn resolve_in_package(
        &self,
        target: &serde_json::Value,
        star: Option<&str>,
        package_dir: &str,
        mode: ResolutionMode,
    ) -> Option<String> {
        let names: &[&str] = match mode {
            ResolutionMode::Require => &["node", "require"],
            ResolutionMode::Import => &["node", "import"],
        };
        let conditions = Conditions {
            names,
            fall_through: false,
        };
        let mut trace = ResolveTrace::new();
        resolve_target(target, star, &conditions, &mut trace, &mut |rel, _| {
            let path = vpath::join(package_dir, rel);
            self.fs.file_exists(&path).then_some(path)
        })
    }

    fn manifest(&self, dir: &str) -> Option<PackageJson> {
        let text = self.fs.read_file(&vpath::join(dir, "package.json"))?;
        PackageJson::parse(text).ok()
    }

    fn nearest_manifest(&self, dir: &str) -> Option<(String, PackageJson)> {
        vpath::ancestors(dir)
            .into_iter()
            .find_map(|ancestor| self.manifest(ancestor).map(|m| (ancestor.to_string(), m)))
    }
}

/// Decoded virtual path of a `file:` URL.
fn url_path(url: &Url) -> String {
    percent_decode_str(url.path()).decode_utf8_lossy().into_owned()
}

/// `@scope/name/sub` into (`@scope/name`, `./sub`); `name` into (`name`, `.`).
pub(crate) fn split_package_specifier(specifier: &str) -> Option<(String, String)> {
    let mut parts = specifier.splitn(3, '/');
    let first = parts.next().filter(|s| !s.is_empty())?;
    let (name, rest) = if first.starts_with('@') {
        let second = parts.next().filter(|s| !s.is_empty())?;
        (format!("{first}/{second}"), parts.next())
    } else {
        let rest = specifier.split_once('/').map(|(_, rest)| rest);
        (first.to_string(), rest)
    };
    let subpath = match rest {
        Some(rest) if !rest.is_empty() => format!("./{rest}"),
        _ => ".".to_string(),
    };
    Some((name, subpath))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    fn package(files: &[(&str, &str)]) -> Package {
        Package::new(
            "pkg",
            "1.0.0",
            files.iter().map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        )
    }

    fn names_of(pkg: &Package, file: &str) -> Vec<String> {
        let root = file_url("/").unwrap();
        resolve_namespace(pkg, &format!("/node_modules/pkg/{file}"), &root).unwrap()
    }

    #[test]
    fn test_commonjs_always_has_default() {
        let pkg = package(&[("package.json", r#"{"name":"pkg"}"#), ("index.js", "console.log('hi');")]);
        assert_eq!(names_of(&pkg, "index.js"), vec!["default"]);
    }

    #[test]
    fn test_commonjs_follows_commonjs_reexports_only() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("index.js", "exports.a = 1;\nmodule.exports = require('./b');\n__exportStar(require('./c.mjs'), exports);"),
            ("b.js", "exports.b = 2;"),
            ("c.mjs", "export const c = 3;"),
        ]);
        assert_eq!(names_of(&pkg, "index.js"), vec!["a", "default", "b"]);
    }

    #[test]
    fn test_esm_star_reexports_drop_default() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg","type":"module"}"#),
            ("index.js", "export const a = 1;\nexport default a;\nexport * from './b.js';"),
            ("b.js", "export const b = 2;\nexport default b;"),
        ]);
        assert_eq!(names_of(&pkg, "index.js"), vec!["a", "default", "b"]);
    }

    #[test]
    fn test_esm_star_of_commonjs_exposes_its_names() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("index.mjs", "export * from './lib.js';"),
            ("lib.js", "exports.x = 1;"),
        ]);
        assert_eq!(names_of(&pkg, "index.mjs"), vec!["x"]);
    }

    #[test]
    fn test_mutual_reexport_terminates() {
        let cyclic = package(&[
            ("package.json", r#"{"name":"pkg","type":"module"}"#),
            ("a.js", "export const a = 1;\nexport * from './b.js';"),
            ("b.js", "export const b = 2;\nexport * from './a.js';"),
        ]);
        let acyclic = package(&[
            ("package.json", r#"{"name":"pkg","type":"module"}"#),
            ("a.js", "export const a = 1;\nexport * from './b.js';"),
            ("b.js", "export const b = 2;"),
        ]);
        assert_eq!(names_of(&cyclic, "a.js"), names_of(&acyclic, "a.js"));
        assert_eq!(names_of(&cyclic, "a.js"), vec!["a", "b"]);
    }

    #[test]
    fn test_json_and_unknown_formats() {
        let pkg = package(&[("package.json", r#"{"name":"pkg"}"#), ("data.json", "{\"a\":1}"), ("addon.node", "")]);
        assert_eq!(names_of(&pkg, "data.json"), vec!["default"]);
        assert_eq!(names_of(&pkg, "addon.node"), vec!["default"]);
    }

    #[test]
    fn test_bare_specifier_uses_node_conditions_without_fall_through() {
        let pkg = package(&[
            (
                "package.json",
                r#"{"name":"pkg","exports":{".":{"types":"./index.d.ts","import":"./missing.mjs","default":"./index.js"}}}"#,
            ),
            ("index.js", "exports.fromDefault = 1;"),
        ]);
        let from = file_url("/node_modules/pkg/consumer.mjs").unwrap();
        assert!(matches!(
            resolve_namespace(&pkg, "pkg", &from),
            Err(Error::Namespace { .. })
        ));
    }

    #[test]
    fn test_require_probes_extensions_and_directories() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("index.js", "module.exports = { ...require('./lib') };"),
            ("lib/package.json", r#"{"main":"main"}"#),
            ("lib/main.js", "exports.deep = 1;"),
        ]);
        assert_eq!(names_of(&pkg, "index.js"), vec!["default", "deep"]);
    }

    #[test]
    fn test_unresolvable_reexport_is_skipped() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("index.js", "exports.foo = 1;\nmodule.exports = require('some-dep');"),
            ("star.js", "exports.a = 1;\n__exportStar(require('./gone'), exports);"),
        ]);
        assert_eq!(names_of(&pkg, "index.js"), vec!["foo", "default"]);
        assert_eq!(names_of(&pkg, "star.js"), vec!["a", "default"]);
    }

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(split_package_specifier("pkg"), Some(("pkg".into(), ".".into())));
        assert_eq!(split_package_specifier("pkg/a/b"), Some(("pkg".into(), "./a/b".into())));
        assert_eq!(split_package_specifier("@s/pkg/a"), Some(("@s/pkg".into(), "./a".into())));
        assert_eq!(split_package_specifier("@s"), None);
    }

    #[test]
    fn test_percent_encoded_paths() {
        let pkg = package(&[("package.json", r#"{"name":"pkg"}"#), ("with space.js", "exports.s = 1;")]);
        assert_eq!(names_of(&pkg, "with space.js"), vec!["s", "default"]);
    }
}
