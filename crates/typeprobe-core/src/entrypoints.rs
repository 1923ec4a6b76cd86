//! Entrypoint discovery.

use crate::config::{CheckOptions, EntrypointFilter};
use crate::error::{Error, Result};
use crate::kinds::{is_declaration_file, is_javascript_file, is_typescript_file};
use crate::package::{Package, PackageFs, PackageJson};
use regex_lite::Regex;
use serde_json::Value;
use typeprobe_util::vpath;

/// `""`, `"."` and `"./"` are the root; everything else gains a `./` prefix
/// and loses a trailing slash.
#[must_use]
pub fn normalize_subpath(subpath: &str) -> String {
    let trimmed = subpath.trim_end_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() || trimmed == "." {
        ".".to_string()
    } else {
        format!("./{trimmed}")
    }
}

/// The subpaths to check, in first-seen order.
pub fn resolve_entrypoints(package: &Package, options: &CheckOptions) -> Result<Vec<String>> {
    let mut subpaths = Vec::new();
    if options.entrypoints.is_empty() {
        push_unique(&mut subpaths, discover(package, &package.root_dir(), options)?);
        if let Some(types_root) = package.types_root_dir() {
            push_unique(&mut subpaths, discover(package, &types_root, options)?);
        }
        push_unique(
            &mut subpaths,
            options.include_entrypoints.iter().map(|s| normalize_subpath(s)),
        );
    } else {
        push_unique(
            &mut subpaths,
            options.entrypoints.iter().map(|s| normalize_subpath(s)),
        );
    }

    let filters = compile_filters(&options.exclude_entrypoints)?;
    subpaths.retain(|subpath| !filters.iter().any(|f| f.matches(subpath)));
    Ok(subpaths)
}

fn push_unique(into: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

fn discover(package: &Package, root: &str, options: &CheckOptions) -> Result<Vec<String>> {
    let manifest = package.manifest_at(root)?.unwrap_or_default();
    if let Some(exports) = &manifest.exports {
        let mut subpaths = Vec::new();
        exports_subpaths(exports, &mut subpaths);
        if subpaths.is_empty() {
            subpaths.push(".".to_string());
        }
        return Ok(subpaths);
    }
    if options.entrypoints_legacy {
        return Ok(published_sources(package, root));
    }
    let mut subpaths = vec![".".to_string()];
    subpaths.extend(proxy_directories(package, root, &manifest)?);
    Ok(subpaths)
}

/// Subpath keys of an `exports` value. A level whose first key starts with
/// `.` is a subpath map; any other object is a condition map to look through.
fn exports_subpaths(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                exports_subpaths(item, out);
            }
        }
        Value::Object(map) => {
            if crate::host::exports::is_subpath_map(map) {
                push_unique(out, map.keys().map(|k| normalize_subpath(k)));
            } else {
                for nested in map.values() {
                    exports_subpaths(nested, out);
                }
            }
        }
        _ => {}
    }
}

/// Nested directories with their own entry-pointing `package.json`.
fn proxy_directories(package: &Package, root: &str, root_manifest: &PackageJson) -> Result<Vec<String>> {
    let prefix = format!("{}/", root.trim_end_matches('/'));
    let mut dirs = Vec::new();
    for path in package.list_files(&prefix) {
        let Some(rel) = vpath::strip_dir(path, root) else {
            continue;
        };
        if rel == "package.json" || !rel.ends_with("/package.json") || rel.contains("node_modules/") {
            continue;
        }
        let dir = vpath::dirname(path);
        let Some(manifest) = package.manifest_at(dir)? else {
            continue;
        };
        let foreign = match (&manifest.name, &root_manifest.name) {
            (Some(name), Some(own)) => name != own,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if manifest.has_entry_fields() && !foreign {
            if let Some(rel_dir) = vpath::strip_dir(dir, root) {
                dirs.push(normalize_subpath(rel_dir));
            }
        }
    }
    Ok(dirs)
}

/// Every JavaScript or TypeScript source file that is not a declaration.
fn published_sources(package: &Package, root: &str) -> Vec<String> {
    let prefix = format!("{}/", root.trim_end_matches('/'));
    package
        .list_files(&prefix)
        .into_iter()
        .filter_map(|path| vpath::strip_dir(path, root))
        .filter(|rel| !rel.contains("node_modules/"))
        .filter(|rel| (is_javascript_file(rel) || is_typescript_file(rel)) && !is_declaration_file(rel))
        .map(normalize_subpath)
        .collect()
}

enum CompiledFilter {
    Exact(String),
    Pattern(Regex),
}

impl CompiledFilter {
    fn matches(&self, subpath: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == subpath,
            Self::Pattern(regex) => regex.is_match(subpath),
        }
    }
}

fn compile_filters(filters: &[EntrypointFilter]) -> Result<Vec<CompiledFilter>> {
    filters
        .iter()
        .map(|filter| match filter {
            EntrypointFilter::Exact(subpath) => Ok(CompiledFilter::Exact(normalize_subpath(subpath))),
            EntrypointFilter::Pattern { pattern } => Regex::new(pattern)
                .map(CompiledFilter::Pattern)
                .map_err(|e| Error::EntrypointPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(files: &[(&str, &str)]) -> Package {
        Package::new(
            "pkg",
            "1.0.0",
            files.iter().map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        )
    }

    #[test]
    fn test_normalize_subpath() {
        assert_eq!(normalize_subpath(""), ".");
        assert_eq!(normalize_subpath("./"), ".");
        assert_eq!(normalize_subpath("utils"), "./utils");
        assert_eq!(normalize_subpath("./utils/"), "./utils");
    }

    #[test]
    fn test_exports_subpaths_through_conditions() {
        let pkg = package(&[(
            "package.json",
            r#"{"name":"pkg","exports":{".":"./index.js","./utils":{"import":"./u.mjs"},"./feature/*":"./f/*.js","./package.json":"./package.json"}}"#,
        )]);
        let subpaths = resolve_entrypoints(&pkg, &CheckOptions::new()).unwrap();
        assert_eq!(subpaths, vec![".", "./utils", "./feature/*", "./package.json"]);

        let conditional = package(&[(
            "package.json",
            r#"{"name":"pkg","exports":{"node":{".":"./a.js","./b":"./b.js"},"default":"./c.js"}}"#,
        )]);
        let subpaths = resolve_entrypoints(&conditional, &CheckOptions::new()).unwrap();
        assert_eq!(subpaths, vec![".", "./b"]);

        let sugar = package(&[("package.json", r#"{"name":"pkg","exports":"./index.js"}"#)]);
        assert_eq!(resolve_entrypoints(&sugar, &CheckOptions::new()).unwrap(), vec!["."]);
    }

    #[test]
    fn test_proxy_directories() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg","main":"index.js"}"#),
            ("index.js", ""),
            ("utils/package.json", r#"{"main":"../dist/utils.js"}"#),
            ("vendored/package.json", r#"{"name":"other","main":"x.js"}"#),
            ("empty/package.json", "{}"),
        ]);
        let subpaths = resolve_entrypoints(&pkg, &CheckOptions::new()).unwrap();
        assert_eq!(subpaths, vec![".", "./utils"]);
    }

    #[test]
    fn test_legacy_lists_sources() {
        let pkg = package(&[
            ("package.json", r#"{"name":"pkg"}"#),
            ("index.js", ""),
            ("index.d.ts", ""),
            ("lib/util.mjs", ""),
            ("README.md", ""),
        ]);
        let options = CheckOptions::new().with_entrypoints_legacy(true);
        let subpaths = resolve_entrypoints(&pkg, &options).unwrap();
        assert_eq!(subpaths, vec!["./index.js", "./lib/util.mjs"]);
    }

    #[test]
    fn test_include_exclude_and_explicit() {
        let pkg = package(&[(
            "package.json",
            r#"{"name":"pkg","exports":{".":"./i.js","./internal":"./x.js","./legacy/a":"./a.js"}}"#,
        )]);
        let options = CheckOptions::new()
            .with_include_entrypoints(vec!["extra".into()])
            .with_exclude_entrypoints(vec![
                EntrypointFilter::Exact("internal".into()),
                EntrypointFilter::pattern("^\\./legacy/").unwrap(),
            ]);
        assert_eq!(resolve_entrypoints(&pkg, &options).unwrap(), vec![".", "./extra"]);

        let explicit = CheckOptions::new().with_entrypoints(vec!["./only".into()]);
        assert_eq!(resolve_entrypoints(&pkg, &explicit).unwrap(), vec!["./only"]);
    }

    #[test]
    fn test_types_package_contributes_entrypoints() {
        let pkg = package(&[("package.json", r#"{"name":"pkg","exports":{".":"./i.js"}}"#)])
            .with_types_package(
                [
                    ("package.json", r#"{"name":"@types/pkg","version":"1.0.0"}"#),
                    ("extra/package.json", r#"{"types":"../extra.d.ts"}"#),
                ]
                .iter()
                .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
            )
            .unwrap();
        let subpaths = resolve_entrypoints(&pkg, &CheckOptions::new()).unwrap();
        assert_eq!(subpaths, vec![".", "./extra"]);
    }
}
