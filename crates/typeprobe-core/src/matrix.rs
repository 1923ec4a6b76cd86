//! The entrypoint x resolution-kind matrix.

use crate::config::CheckOptions;
use crate::host::HostSet;
use crate::kinds::{Resolution, ResolutionKind};
use serde::Serialize;

/// What one resolution kind sees for one entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionCell {
    pub kind: ResolutionKind,
    /// Disabled by configuration; nothing was resolved or checked.
    pub disabled: bool,
    /// Type-level resolution.
    pub resolution: Option<Resolution>,
    /// Resolution with declaration files excluded.
    pub implementation_resolution: Option<Resolution>,
    /// Files reachable from the type-level entry.
    pub files: Option<Vec<String>>,
    /// Indices into the analysis problem list.
    pub visible_problems: Vec<usize>,
}

impl ResolutionCell {
    fn inert(kind: ResolutionKind, disabled: bool) -> Self {
        Self {
            kind,
            disabled,
            resolution: None,
            implementation_resolution: None,
            files: None,
            visible_problems: Vec::new(),
        }
    }

    /// Whether checks run on this cell.
    #[must_use]
    pub fn is_checked(&self, wildcard: bool) -> bool {
        !self.disabled && !wildcard
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrypoint {
    pub subpath: String,
    pub has_types: bool,
    pub is_wildcard: bool,
    /// One cell per kind, in [`ResolutionKind::ALL`] order.
    pub resolutions: Vec<ResolutionCell>,
}

impl Entrypoint {
    #[must_use]
    pub fn cell(&self, kind: ResolutionKind) -> Option<&ResolutionCell> {
        self.resolutions.iter().find(|c| c.kind == kind)
    }
}

/// The specifier a consumer writes to import `subpath` of `package_name`.
#[must_use]
pub fn entrypoint_specifier(package_name: &str, subpath: &str) -> String {
    match subpath.strip_prefix('.') {
        Some("") | None => package_name.to_string(),
        Some(rest) => format!("{package_name}{rest}"),
    }
}

/// Resolve every subpath under every kind.
pub fn build_matrix(hosts: &HostSet<'_>, subpaths: &[String], options: &CheckOptions) -> Vec<Entrypoint> {
    let package_name = hosts.package().name();
    let entrypoints: Vec<Entrypoint> = subpaths
        .iter()
        .map(|subpath| {
            let is_wildcard = subpath.contains('*');
            let resolutions: Vec<ResolutionCell> = ResolutionKind::ALL
                .iter()
                .map(|&kind| {
                    if options.is_kind_disabled(kind) || is_wildcard {
                        return ResolutionCell::inert(kind, options.is_kind_disabled(kind));
                    }
                    let specifier = entrypoint_specifier(package_name, subpath);
                    let host = hosts.get(kind.option());
                    let from = kind.importing_file();
                    let resolution = host.resolve(&specifier, from, kind.mode(), false).resolution;
                    let implementation_resolution =
                        host.resolve(&specifier, from, kind.mode(), true).resolution;
                    let files = resolution
                        .as_ref()
                        .map(|r| host.build_program_from(std::slice::from_ref(&r.file_name)));
                    tracing::debug!(
                        subpath = %subpath,
                        kind = %kind,
                        types = resolution.as_ref().map(|r| r.file_name.as_str()),
                        implementation = implementation_resolution.as_ref().map(|r| r.file_name.as_str()),
                        "resolved matrix cell"
                    );
                    ResolutionCell {
                        kind,
                        disabled: false,
                        resolution,
                        implementation_resolution,
                        files,
                        visible_problems: Vec::new(),
                    }
                })
                .collect();
            Entrypoint {
                subpath: subpath.clone(),
                has_types: resolutions
                    .iter()
                    .any(|c| c.resolution.as_ref().is_some_and(|r| r.is_typescript)),
                is_wildcard,
                resolutions,
            }
        })
        .collect();

    record_module_kinds(hosts, &entrypoints);
    entrypoints
}

/// Detect module kinds for every file the matrix touches, once per option.
fn record_module_kinds(hosts: &HostSet<'_>, entrypoints: &[Entrypoint]) {
    for entrypoint in entrypoints {
        for cell in &entrypoint.resolutions {
            let host = hosts.get(cell.kind.option());
            let files = cell.files.iter().flatten();
            let implementation = cell.implementation_resolution.iter().map(|r| &r.file_name);
            for file in files.chain(implementation) {
                host.module_kind_for_file(file);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::ResolutionOption;
    use crate::package::Package;

    fn package(files: &[(&str, &str)]) -> Package {
        Package::new(
            "pkg",
            "1.0.0",
            files.iter().map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        )
    }

    #[test]
    fn test_entrypoint_specifier() {
        assert_eq!(entrypoint_specifier("pkg", "."), "pkg");
        assert_eq!(entrypoint_specifier("@s/pkg", "./utils"), "@s/pkg/utils");
    }

    #[test]
    fn test_cells_per_kind() {
        let pkg = package(&[
            (
                "package.json",
                r#"{"name":"pkg","main":"./index.js","exports":{".":{"types":"./index.d.ts","default":"./index.js"},"./feature/*":"./f/*.js"}}"#,
            ),
            ("index.js", "module.exports = 1;"),
            ("index.d.ts", "import './other';\nexport {};"),
            ("other.d.ts", "export {};"),
        ]);
        let hosts = HostSet::new(&pkg);
        let options = CheckOptions::new().with_excluded_resolution_kinds(vec![ResolutionKind::Classic]);
        let matrix = build_matrix(&hosts, &[".".into(), "./feature/*".into()], &options);

        let root = &matrix[0];
        assert!(root.has_types);
        assert!(root.cell(ResolutionKind::Classic).unwrap().disabled);
        let bundler = root.cell(ResolutionKind::Bundler).unwrap();
        assert_eq!(
            bundler.resolution.as_ref().unwrap().file_name,
            "/node_modules/pkg/index.d.ts"
        );
        assert_eq!(
            bundler.implementation_resolution.as_ref().unwrap().file_name,
            "/node_modules/pkg/index.js"
        );
        assert_eq!(
            bundler.files.as_deref().unwrap(),
            ["/node_modules/pkg/index.d.ts", "/node_modules/pkg/other.d.ts"]
        );

        let wildcard = &matrix[1];
        assert!(wildcard.is_wildcard);
        assert!(!wildcard.has_types);
        assert!(wildcard.resolutions.iter().all(|c| c.resolution.is_none()));

        let kinds = hosts.get(ResolutionOption::Dual).module_kinds();
        assert!(kinds.contains_key("/node_modules/pkg/index.js"));
        assert!(kinds.contains_key("/node_modules/pkg/other.d.ts"));
    }
}
