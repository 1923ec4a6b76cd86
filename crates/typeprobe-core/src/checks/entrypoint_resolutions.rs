use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::host::trace::resolved_through_fallback;
use crate::kinds::{ModuleKind, ResolutionKind, ResolutionOption};
use crate::problem::Problem;

/// Whether each entrypoint resolves to types, and how.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntrypointResolutions;

impl Check for EntrypointResolutions {
    fn name(&self) -> &'static str {
        "EntrypointResolutions"
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        Some(vec![cx.subpath.into(), cx.kind.into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let subpath = deps.string(0)?;
        let kind = deps.kind(1)?;
        let cell = env.cell(subpath, kind)?;
        let entrypoint = subpath.to_string();

        let Some(resolution) = &cell.resolution else {
            return Ok(vec![Problem::NoResolution {
                entrypoint,
                resolution_kind: kind,
            }]);
        };

        let mut problems = Vec::new();
        if !resolution.is_typescript && !resolution.is_json {
            problems.push(Problem::UntypedResolution {
                entrypoint: entrypoint.clone(),
                resolution_kind: kind,
            });
        }

        if kind == ResolutionKind::DualCjs {
            let host = env.host(ResolutionOption::Dual);
            let is_esm = |file: &str| host.module_kind_for_file(file).detected_kind == ModuleKind::Esm;
            let implementation_is_esm = cell
                .implementation_resolution
                .as_ref()
                .is_some_and(|r| is_esm(&r.file_name));
            if is_esm(&resolution.file_name) || implementation_is_esm {
                problems.push(Problem::CjsResolvesToEsm {
                    entrypoint: entrypoint.clone(),
                    resolution_kind: kind,
                });
            }
        }

        if resolved_through_fallback(&resolution.trace) {
            problems.push(Problem::FallbackCondition {
                entrypoint,
                resolution_kind: kind,
            });
        }
        Ok(problems)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckOptions;
    use crate::kinds::ResolutionKind;
    use crate::package::Package;
    use crate::problem::Problem;

    fn analyze(files: &[(&str, &str)]) -> Vec<Problem> {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            files.iter().map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        crate::check_package(&pkg, &CheckOptions::new()).unwrap().problems
    }

    #[test]
    fn test_untyped_and_missing() {
        let problems = analyze(&[
            ("package.json", r#"{"name":"pkg","exports":{".":"./index.js","./gone":"./gone.js"}}"#),
            ("index.js", "module.exports = {};"),
        ]);
        assert!(problems.contains(&Problem::UntypedResolution {
            entrypoint: ".".into(),
            resolution_kind: ResolutionKind::Bundler,
        }));
        assert!(problems.contains(&Problem::NoResolution {
            entrypoint: "./gone".into(),
            resolution_kind: ResolutionKind::DualEsm,
        }));
    }

    #[test]
    fn test_fallback_condition_reported() {
        let problems = analyze(&[
            (
                "package.json",
                r#"{"name":"pkg","exports":{".":{"import":{"types":"./missing.d.mts"},"default":"./index.js"}}}"#,
            ),
            ("index.js", "module.exports = {};"),
            ("index.d.ts", "export {};"),
        ]);
        assert!(problems.contains(&Problem::FallbackCondition {
            entrypoint: ".".into(),
            resolution_kind: ResolutionKind::Bundler,
        }));
        assert!(!problems.contains(&Problem::FallbackCondition {
            entrypoint: ".".into(),
            resolution_kind: ResolutionKind::DualCjs,
        }));
    }
}
