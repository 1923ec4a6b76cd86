//! Type-level module resolution.
//!
//! Follows the TypeScript compiler's algorithms: `classic` is the
//! pre-`exports` Node algorithm, `dual` is Node's CommonJS/ESM split as the
//! type checker sees it and `bundler` honors `exports` with extensionless
//! relative imports allowed everywhere.

use super::exports::{exports_entry, match_key, resolve_target, Conditions};
use super::trace::ResolveTrace;
use super::{Host, ResolveOutcome};
use crate::kinds::{is_typescript_file, Resolution, ResolutionMode, ResolutionOption};
use crate::namespace::split_package_specifier;
use crate::package::{mangle_scoped_name, PackageFs};
use typeprobe_util::vpath;

/// Which family of files a pass may land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extensions {
    TypeScript,
    JavaScript,
}

impl Extensions {
    fn describe(self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript, Declaration",
            Self::JavaScript => "JavaScript, JSON",
        }
    }

    /// Suffixes appended to an extensionless path.
    fn probe_suffixes(self) -> &'static [&'static str] {
        match self {
            Self::TypeScript => &[".ts", ".tsx", ".d.ts"],
            Self::JavaScript => &[".js", ".jsx"],
        }
    }

    fn index_files(self) -> &'static [&'static str] {
        match self {
            Self::TypeScript => &["index.ts", "index.tsx", "index.d.ts"],
            Self::JavaScript => &["index.js", "index.jsx"],
        }
    }
}

/// Replacement candidates for a path with an explicit JavaScript extension.
const EXTENSION_REPLACEMENTS: &[(&str, &[&str])] = &[
    (".js", &[".ts", ".tsx", ".d.ts"]),
    (".jsx", &[".tsx", ".ts", ".d.ts"]),
    (".mjs", &[".mts", ".d.mts"]),
    (".cjs", &[".cts", ".d.cts"]),
];

const KNOWN_EXTENSIONS: &[&str] = &[
    ".d.ts", ".d.mts", ".d.cts", ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs",
    ".json",
];

fn has_known_extension(path: &str) -> bool {
    KNOWN_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub(super) fn resolve_module(
    host: &Host<'_>,
    specifier: &str,
    from_file: &str,
    mode: ResolutionMode,
    no_dts: bool,
) -> ResolveOutcome {
    let mut resolver = TypeResolver {
        host,
        mode,
        trace: ResolveTrace::new(),
    };
    resolver
        .trace
        .push(format!("======== Resolving module '{specifier}' from '{from_file}'. ========"));
    resolver.describe_mode();

    let passes: &[Extensions] = if no_dts {
        &[Extensions::JavaScript]
    } else {
        &[Extensions::TypeScript, Extensions::JavaScript]
    };
    let from_dir = vpath::dirname(from_file);
    let found = passes
        .iter()
        .find_map(|&ext| resolver.resolve_pass(specifier, from_dir, ext));

    let mut trace = resolver.trace;
    let resolution = match found {
        Some(file_name) => {
            trace.push(format!(
                "======== Module name '{specifier}' was successfully resolved to '{file_name}'. ========"
            ));
            Some(file_name)
        }
        None => {
            trace.push(format!("======== Module name '{specifier}' was not resolved. ========"));
            None
        }
    };
    let trace = trace.into_lines();
    ResolveOutcome {
        resolution: resolution.map(|file_name| Resolution {
            is_typescript: is_typescript_file(&file_name),
            is_json: file_name.ends_with(".json"),
            file_name,
            trace: trace.clone(),
        }),
        trace,
    }
}

struct TypeResolver<'h, 'p> {
    host: &'h Host<'p>,
    mode: ResolutionMode,
    trace: ResolveTrace,
}

impl TypeResolver<'_, '_> {
    fn option(&self) -> ResolutionOption {
        self.host.option
    }

    fn condition_names(&self) -> &'static [&'static str] {
        match (self.option(), self.mode) {
            (ResolutionOption::Dual, ResolutionMode::Import) => &["types", "node", "import"],
            (ResolutionOption::Dual, _) => &["types", "node", "require"],
            (_, ResolutionMode::Require) => &["types", "require"],
            _ => &["types", "import"],
        }
    }

    fn conditions(&self) -> Conditions<'static> {
        Conditions {
            names: self.condition_names(),
            fall_through: true,
        }
    }

    fn describe_mode(&mut self) {
        if self.option() == ResolutionOption::Classic {
            self.trace.push("Module resolution kind is 'classic'.");
            return;
        }
        let mode = if self.mode == ResolutionMode::Import { "ESM" } else { "CJS" };
        let conditions = self
            .condition_names()
            .iter()
            .map(|c| format!("'{c}'"))
            .collect::<Vec<_>>()
            .join(", ");
        self.trace
            .push(format!("Resolving in {mode} mode with conditions {conditions}."));
    }

    /// Relative imports in ESM files under the dual algorithm must name the
    /// file exactly.
    fn allows_probing(&self) -> bool {
        !(self.option() == ResolutionOption::Dual && self.mode == ResolutionMode::Import)
    }

    fn resolve_pass(&mut self, specifier: &str, from_dir: &str, ext: Extensions) -> Option<String> {
        if specifier.starts_with('/') || vpath::is_relative_specifier(specifier) {
            let path = vpath::join(from_dir, specifier);
            self.trace.push(format!(
                "Loading module as file / folder, candidate module location '{path}', target file types: {}.",
                ext.describe()
            ));
            let probe = self.allows_probing();
            let directory_only = specifier.ends_with('/') || specifier.ends_with('.');
            if !directory_only {
                if let Some(found) = self.load_file(&path, ext, probe) {
                    return Some(found);
                }
            }
            return if probe {
                self.load_directory(&path, ext)
            } else {
                None
            };
        }
        if specifier.starts_with('#') {
            return self.resolve_import_map(specifier, from_dir, ext);
        }
        self.resolve_bare(specifier, from_dir, ext)
    }

    /// The file itself, its extension replacements, or (when probing) the
    /// path with an extension appended.
    fn load_file(&mut self, path: &str, ext: Extensions, probe: bool) -> Option<String> {
        if let Some(found) = self.load_exact_or_replaced(path, ext) {
            return Some(found);
        }
        if probe && !has_known_extension(path) {
            for suffix in ext.probe_suffixes() {
                let candidate = format!("{path}{suffix}");
                if self.try_file(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn load_exact_or_replaced(&mut self, path: &str, ext: Extensions) -> Option<String> {
        match ext {
            Extensions::TypeScript => {
                if is_typescript_file(path) || path.ends_with(".json") {
                    return self.try_file(path).then(|| path.to_string());
                }
                let (js_ext, replacements) = EXTENSION_REPLACEMENTS
                    .iter()
                    .find(|(js_ext, _)| path.ends_with(js_ext))?;
                let stem = &path[..path.len() - js_ext.len()];
                for replacement in *replacements {
                    let candidate = format!("{stem}{replacement}");
                    if self.try_file(&candidate) {
                        return Some(candidate);
                    }
                }
                None
            }
            Extensions::JavaScript => {
                let loadable = EXTENSION_REPLACEMENTS.iter().any(|(js, _)| path.ends_with(js))
                    || path.ends_with(".json");
                (loadable && self.try_file(path)).then(|| path.to_string())
            }
        }
    }

    fn try_file(&mut self, path: &str) -> bool {
        let exists = self.host.package.file_exists(path);
        if exists {
            self.trace
                .push(format!("File '{path}' exists - use it as a name resolution result."));
        } else {
            self.trace.push(format!("File '{path}' does not exist."));
        }
        exists
    }

    /// `types`/`typings` (type-level pass) or `main`, then `index`.
    fn load_directory(&mut self, dir: &str, ext: Extensions) -> Option<String> {
        if !self.host.package.directory_exists(dir) {
            self.trace
                .push(format!("Directory '{dir}' does not exist, skipping all lookups in it."));
            return None;
        }
        if let Some(manifest) = self.host.manifest(dir) {
            self.trace.push(format!("Found 'package.json' at '{dir}/package.json'."));
            let entry = match ext {
                Extensions::TypeScript => manifest
                    .types_entry()
                    .map(|t| ("types", t.to_string()))
                    .or_else(|| manifest.main().map(|m| ("main", m.to_string()))),
                Extensions::JavaScript => manifest.main().map(|m| ("main", m.to_string())),
            };
            if let Some((field, value)) = entry {
                let path = vpath::join(dir, &value);
                self.trace
                    .push(format!("'package.json' has '{field}' field '{value}' that references '{path}'."));
                if let Some(found) = self.load_file(&path, ext, true) {
                    return Some(found);
                }
                if path != dir {
                    if let Some(found) = self.load_index(&path, ext) {
                        return Some(found);
                    }
                }
            }
        }
        self.load_index(dir, ext)
    }

    fn load_index(&mut self, dir: &str, ext: Extensions) -> Option<String> {
        for index in ext.index_files() {
            let candidate = vpath::join(dir, index);
            if self.try_file(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn resolve_bare(&mut self, specifier: &str, from_dir: &str, ext: Extensions) -> Option<String> {
        let Some((name, subpath)) = split_package_specifier(specifier) else {
            self.trace.push(format!("Invalid package specifier '{specifier}'."));
            return None;
        };
        self.trace.push(format!(
            "Loading module '{specifier}' from 'node_modules' folder, target file types: {}.",
            ext.describe()
        ));
        for ancestor in vpath::ancestors(from_dir) {
            if vpath::basename(ancestor) == "node_modules" {
                continue;
            }
            let node_modules = vpath::join(ancestor, "node_modules");
            if !self.host.package.directory_exists(&node_modules) {
                self.trace.push(format!(
                    "Directory '{node_modules}' does not exist, skipping all lookups in it."
                ));
                continue;
            }
            let package_dir = vpath::join(&node_modules, &name);
            if let Some(found) = self.load_from_package(&package_dir, &subpath, ext) {
                return Some(found);
            }
            if ext == Extensions::TypeScript {
                let types_dir = vpath::join(&node_modules, &format!("@types/{}", mangle_scoped_name(&name)));
                if let Some(found) = self.load_from_package(&types_dir, &subpath, ext) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn load_from_package(&mut self, package_dir: &str, subpath: &str, ext: Extensions) -> Option<String> {
        if !self.host.package.directory_exists(package_dir) {
            return None;
        }
        let manifest = self.host.manifest(package_dir);
        let exports = manifest
            .as_ref()
            .filter(|_| self.option().uses_exports())
            .and_then(|m| m.exports.clone());

        if let Some(exports) = exports {
            self.trace
                .push(format!("Found 'package.json' at '{package_dir}/package.json' with an 'exports' field."));
            let Some((target, star)) = exports_entry(&exports, subpath) else {
                self.trace.push(format!(
                    "Export specifier '{subpath}' does not exist in package.json scope (path '{package_dir}')."
                ));
                return None;
            };
            return self.resolve_package_target(target, star.as_deref(), package_dir, ext);
        }

        if subpath == "." {
            return self.load_directory(package_dir, ext);
        }
        let path = vpath::join(package_dir, subpath);
        self.load_file(&path, ext, true)
            .or_else(|| self.load_directory(&path, ext))
    }

    fn resolve_import_map(&mut self, specifier: &str, from_dir: &str, ext: Extensions) -> Option<String> {
        if !self.option().uses_exports() {
            self.trace
                .push(format!("Package imports '{specifier}' are not supported by this resolution mode."));
            return None;
        }
        let Some((package_dir, manifest)) = self.host.nearest_manifest(from_dir) else {
            self.trace.push("No 'package.json' scope found for package imports.");
            return None;
        };
        let Some(imports) = manifest.imports.as_ref().and_then(|v| v.as_object()) else {
            self.trace
                .push(format!("'package.json' at '{package_dir}' has no 'imports' field."));
            return None;
        };
        let Some((target, star)) = match_key(imports, specifier) else {
            self.trace.push(format!(
                "Import specifier '{specifier}' does not exist in package.json scope (path '{package_dir}')."
            ));
            return None;
        };
        let target = target.clone();
        self.resolve_package_target(&target, star.as_deref(), &package_dir, ext)
    }

    fn resolve_package_target(
        &mut self,
        target: &serde_json::Value,
        star: Option<&str>,
        package_dir: &str,
        ext: Extensions,
    ) -> Option<String> {
        let conditions = self.conditions();
        let mut trace = std::mem::take(&mut self.trace);
        let found = resolve_target(target, star, &conditions, &mut trace, &mut |rel, trace| {
            std::mem::swap(&mut self.trace, trace);
            let path = vpath::join(package_dir, rel);
            let found = self.load_exact_or_replaced(&path, ext);
            std::mem::swap(&mut self.trace, trace);
            found
        });
        self.trace = trace;
        found
    }
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

    fn resolved(host: &Host<'_>, specifier: &str, from: &str, mode: ResolutionMode, no_dts: bool) -> Option<String> {
        host.resolve(specifier, from, mode, no_dts)
            .resolution
            .map(|r| r.file_name)
    }

    #[test]
    fn test_types_condition_preferred_and_implementation_separate() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg","exports":{".":{"types":"./index.d.mts","default":"./index.js"}}}"#),
            ("index.d.mts", "export declare const a: number;"),
            ("index.js", "module.exports.a = 1;"),
        ]);
        let dual = Host::new(&pkg, ResolutionOption::Dual);
        assert_eq!(
            resolved(&dual, "pkg", "/index.ts", ResolutionMode::Require, false).as_deref(),
            Some("/node_modules/pkg/index.d.mts")
        );
        assert_eq!(
            resolved(&dual, "pkg", "/index.ts", ResolutionMode::Require, true).as_deref(),
            Some("/node_modules/pkg/index.js")
        );
    }

    #[test]
    fn test_classic_ignores_exports() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg","main":"./lib/main.js","exports":{".":"./esm/index.js"}}"#),
            ("lib/main.js", ""),
            ("lib/main.d.ts", "export {};"),
            ("esm/index.js", ""),
        ]);
        let classic = Host::new(&pkg, ResolutionOption::Classic);
        assert_eq!(
            resolved(&classic, "pkg", "/index.ts", ResolutionMode::Require, false).as_deref(),
            Some("/node_modules/pkg/lib/main.d.ts")
        );
        let bundler = Host::new(&pkg, ResolutionOption::Bundler);
        assert_eq!(
            resolved(&bundler, "pkg", "/index.ts", ResolutionMode::Import, false).as_deref(),
            Some("/node_modules/pkg/esm/index.js")
        );
    }

    #[test]
    fn test_esm_relative_imports_need_extensions_under_dual() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("a.d.mts", "import { b } from './b';"),
            ("b.d.ts", "export declare const b: number;"),
        ]);
        let dual = Host::new(&pkg, ResolutionOption::Dual);
        let from = "/node_modules/pkg/a.d.mts";
        assert_eq!(resolved(&dual, "./b", from, ResolutionMode::Import, false), None);
        assert_eq!(
            resolved(&dual, "./b.js", from, ResolutionMode::Import, false).as_deref(),
            Some("/node_modules/pkg/b.d.ts")
        );
        let bundler = Host::new(&pkg, ResolutionOption::Bundler);
        assert_eq!(
            resolved(&bundler, "./b", from, ResolutionMode::Import, false).as_deref(),
            Some("/node_modules/pkg/b.d.ts")
        );
    }

    #[test]
    fn test_failed_condition_falls_through_with_trace() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg","exports":{".":{"import":"./missing.mjs","require":"./index.cjs","default":"./index.js"}}}"#),
            ("index.js", ""),
            ("index.d.ts", "export {};"),
        ]);
        let bundler = Host::new(&pkg, ResolutionOption::Bundler);
        let outcome = bundler.resolve("pkg", "/index.ts", ResolutionMode::Import, false);
        let resolution = outcome.resolution.unwrap();
        assert_eq!(resolution.file_name, "/node_modules/pkg/index.d.ts");
        assert!(resolution.is_typescript);
        assert!(outcome.trace.iter().any(|l| l == "Failed to resolve under condition 'import'."));
        assert!(outcome.trace.iter().any(|l| l == "Saw non-matching condition 'require'."));
        assert!(outcome.trace.iter().any(|l| l == "Resolved under condition 'default'."));
    }

    #[test]
    fn test_types_package_fallback() {
        let pkg = package(&[("package.json", r#"{"name":"pkg","main":"index.js"}"#), ("index.js", "")])
            .with_types_package(vec![
                ("package.json".to_string(), r#"{"name":"@types/pkg","version":"1.0.0"}"#.to_string()),
                ("index.d.ts".to_string(), "export {};".to_string()),
            ])
            .unwrap();
        let host = Host::new(&pkg, ResolutionOption::Classic);
        assert_eq!(
            resolved(&host, "pkg", "/index.ts", ResolutionMode::Require, false).as_deref(),
            Some("/node_modules/@types/pkg/index.d.ts")
        );
    }

    #[test]
    fn test_package_imports_map() {
        let pkg = package(&[
            ("package.json", r##"{"name":"pkg","imports":{"#internal/*":{"types":"./src/*.d.ts","default":"./src/*.js"}}}"##),
            ("src/util.d.ts", "export {};"),
            ("src/util.js", ""),
        ]);
        let host = Host::new(&pkg, ResolutionOption::Bundler);
        let from = "/node_modules/pkg/index.d.ts";
        assert_eq!(
            resolved(&host, "#internal/util", from, ResolutionMode::Import, false).as_deref(),
            Some("/node_modules/pkg/src/util.d.ts")
        );
        let classic = Host::new(&pkg, ResolutionOption::Classic);
        assert_eq!(resolved(&classic, "#internal/util", from, ResolutionMode::Require, false), None);
    }

    #[test]
    fn test_directory_index_and_json() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("lib/index.d.ts", "export {};"),
            ("data.json", "{}"),
        ]);
        let host = Host::new(&pkg, ResolutionOption::Bundler);
        assert_eq!(
            resolved(&host, "pkg/lib", "/index.ts", ResolutionMode::Import, false).as_deref(),
            Some("/node_modules/pkg/lib/index.d.ts")
        );
        let json = host
            .resolve("pkg/data.json", "/index.ts", ResolutionMode::Import, false)
            .resolution
            .unwrap();
        assert!(json.is_json);
        assert!(!json.is_typescript);
    }

    #[test]
    fn test_unresolved_is_not_an_error() {
        let pkg = package(&[("package.json", r#"{"name":"pkg"}"#)]);
        let host = Host::new(&pkg, ResolutionOption::Dual);
        let outcome = host.resolve("other", "/index.ts", ResolutionMode::Require, false);
        assert!(outcome.resolution.is_none());
        assert_eq!(
            outcome.trace.last().map(String::as_str),
            Some("======== Module name 'other' was not resolved. ========")
        );
    }
}
