//! Whole-package analysis.

use crate::config::CheckOptions;
use crate::engine::Engine;
use crate::entrypoints::resolve_entrypoints;
use crate::error::Result;
use crate::host::HostSet;
use crate::kinds::{ModuleKindRecord, ResolutionOption};
use crate::matrix::{build_matrix, Entrypoint};
use crate::package::{Package, PackageIdentity};
use crate::problem::Problem;
use serde::Serialize;
use std::collections::BTreeMap;

/// Build tools recognized among `devDependencies`.
pub const BUILD_TOOLS: &[&str] = &[
    "@arethetypeswrong/cli",
    "@babel/core",
    "@microsoft/api-extractor",
    "@rollup/plugin-typescript",
    "@swc/core",
    "bunchee",
    "esbuild",
    "microbundle",
    "parcel",
    "pkgroll",
    "rollup",
    "rollup-plugin-dts",
    "tshy",
    "tsup",
    "typescript",
    "unbuild",
    "vite",
    "webpack",
];

/// Where the package's types come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TypesTag {
    None,
    Included,
    #[serde(rename_all = "camelCase")]
    PairedTypesPackage {
        package_name: String,
        package_version: String,
    },
}

/// Everything learned about a package.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub package_name: String,
    pub package_version: String,
    pub types: TypesTag,
    pub build_tools: BTreeMap<String, String>,
    pub entrypoints: Vec<Entrypoint>,
    pub module_kinds: BTreeMap<ResolutionOption, BTreeMap<String, ModuleKindRecord>>,
    pub problems: Vec<Problem>,
}

impl Analysis {
    /// Problems visible in any cell of `subpath`, in list order.
    #[must_use]
    pub fn problems_for(&self, subpath: &str) -> Vec<&Problem> {
        let mut indices: Vec<usize> = self
            .entrypoints
            .iter()
            .filter(|e| e.subpath == subpath)
            .flat_map(|e| e.resolutions.iter())
            .flat_map(|c| c.visible_problems.iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.iter().filter_map(|&i| self.problems.get(i)).collect()
    }
}

/// Analyze a package with the standard checks.
pub fn check_package(package: &Package, options: &CheckOptions) -> Result<Analysis> {
    check_package_with(package, options, &Engine::new())
}

/// Analyze a package with a custom engine.
pub fn check_package_with(package: &Package, options: &CheckOptions, engine: &Engine<'_>) -> Result<Analysis> {
    options.validate()?;
    let root_manifest = package.manifest_at(&package.root_dir())?.unwrap_or_default();

    let hosts = HostSet::new(package);
    let subpaths = resolve_entrypoints(package, options)?;
    tracing::debug!(package = package.name(), entrypoints = subpaths.len(), "analyzing");
    let mut entrypoints = build_matrix(&hosts, &subpaths, options);
    let problems = engine.run(&mut entrypoints, &hosts, options)?;

    let types = match package.types_identity() {
        Some(identity) => TypesTag::PairedTypesPackage {
            package_name: identity.name.clone(),
            package_version: identity.version.clone(),
        },
        None if entrypoints.iter().any(|e| e.has_types) => TypesTag::Included,
        None => TypesTag::None,
    };
    let build_tools = BUILD_TOOLS
        .iter()
        .filter_map(|tool| {
            root_manifest
                .dev_dependency(tool)
                .map(|version| ((*tool).to_string(), version.to_string()))
        })
        .collect();
    let module_kinds = ResolutionOption::ALL
        .iter()
        .map(|&option| (option, hosts.get(option).module_kinds()))
        .collect();

    let PackageIdentity { name, version } = package.identity().clone();
    Ok(Analysis {
        package_name: name,
        package_version: version,
        types,
        build_tools,
        entrypoints,
        module_kinds,
        problems,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_types_and_build_tools() {
        let pkg = Package::new(
            "pkg",
            "2.1.0",
            [
                (
                    "package.json",
                    r#"{"name":"pkg","types":"index.d.ts","devDependencies":{"typescript":"^5.4.0","left-pad":"1.0.0"}}"#,
                ),
                ("index.js", "module.exports = {};"),
                ("index.d.ts", "export {};"),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let analysis = check_package(&pkg, &CheckOptions::new()).unwrap();
        assert_eq!(analysis.package_version, "2.1.0");
        assert_eq!(analysis.types, TypesTag::Included);
        assert_eq!(analysis.build_tools.len(), 1);
        assert_eq!(analysis.build_tools["typescript"], "^5.4.0");

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["types"]["kind"], "included");
        assert!(json["moduleKinds"]["dual"].is_object());
    }

    #[test]
    fn test_untyped_package() {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [("package.json", r#"{"name":"pkg"}"#), ("index.js", "")]
                .iter()
                .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let analysis = check_package(&pkg, &CheckOptions::new()).unwrap();
        assert_eq!(analysis.types, TypesTag::None);
        assert!(!analysis.problems_for(".").is_empty());
    }
}
