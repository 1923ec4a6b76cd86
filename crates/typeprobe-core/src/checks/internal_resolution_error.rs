use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::kinds::is_declaration_file;
use crate::problem::Problem;
use typeprobe_util::vpath;

/// Imports inside the package's own declaration files must resolve.
/// Imports of other packages are not checked: they are not installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalResolutionError;

impl Check for InternalResolutionError {
    fn name(&self) -> &'static str {
        "InternalResolutionError"
    }

    fn enumerate_files(&self) -> bool {
        true
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        let file = cx.file.filter(|f| is_declaration_file(f))?;
        Some(vec![file.into(), cx.option().into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let file_name = deps.string(0)?;
        let resolution_option = deps.option(1)?;
        let host = env.host(resolution_option);
        let Some(source) = host.get_source_file(file_name) else {
            return Ok(Vec::new());
        };
        let package_name = env.package().name();

        let mut problems = Vec::new();
        for reference in &source.references {
            let specifier = reference.specifier.as_str();
            if !is_internal(specifier, package_name) {
                continue;
            }
            let resolution_mode = host.mode_for_reference(file_name, reference.kind);
            let outcome = host.cached_resolution(file_name, specifier, resolution_mode)?;
            if outcome.resolution.is_none() {
                problems.push(Problem::InternalResolutionError {
                    resolution_option,
                    file_name: file_name.to_string(),
                    pos: reference.span.start,
                    end: reference.span.end,
                    module_specifier: specifier.to_string(),
                    resolution_mode,
                    trace: outcome.trace,
                });
            }
        }
        Ok(problems)
    }
}

/// Relative, `#`-prefixed, or naming the package itself.
fn is_internal(specifier: &str, package_name: &str) -> bool {
    vpath::is_relative_specifier(specifier)
        || specifier.starts_with('#')
        || specifier
            .strip_prefix(package_name)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::is_internal;
    use crate::config::CheckOptions;
    use crate::kinds::{ResolutionMode, ResolutionOption};
    use crate::package::Package;
    use crate::problem::Problem;

    #[test]
    fn test_internal_specifiers() {
        assert!(is_internal("./a", "pkg"));
        assert!(is_internal("#internal", "pkg"));
        assert!(is_internal("pkg/sub", "pkg"));
        assert!(!is_internal("pkg-extra", "pkg"));
        assert!(!is_internal("react", "pkg"));
    }

    #[test]
    fn test_extensionless_import_in_esm_types() {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [
                (
                    "package.json",
                    r#"{"name":"pkg","type":"module","exports":{".":{"types":"./index.d.ts","default":"./index.js"}}}"#,
                ),
                ("index.js", "export const a = 1;"),
                ("index.d.ts", "export { a } from './a';\nimport type { R } from 'react';"),
                ("a.d.ts", "export declare const a: number;"),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let problems = crate::check_package(&pkg, &CheckOptions::new()).unwrap().problems;
        let errors: Vec<&Problem> = problems
            .iter()
            .filter(|p| matches!(p, Problem::InternalResolutionError { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        let Problem::InternalResolutionError {
            resolution_option,
            module_specifier,
            resolution_mode,
            trace,
            ..
        } = errors[0]
        else {
            unreachable!()
        };
        assert_eq!(*resolution_option, ResolutionOption::Dual);
        assert_eq!(module_specifier, "./a");
        assert_eq!(*resolution_mode, ResolutionMode::Import);
        assert!(!trace.is_empty());
    }
}
