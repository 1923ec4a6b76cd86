use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::kinds::{is_javascript_file, ModuleKind, ResolutionKind, ResolutionOption};
use crate::problem::Problem;
use crate::syntax::commonjs_facts;

/// A transpiled CommonJS module that only simulates a default export:
/// `exports.default` plus `__esModule`, with `module.exports` never assigned.
/// Bundlers honor the marker; Node does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct CjsOnlyExportsDefault;

impl Check for CjsOnlyExportsDefault {
    fn name(&self) -> &'static str {
        "CJSOnlyExportsDefault"
    }

    fn enumerate_files(&self) -> bool {
        true
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        if cx.kind != ResolutionKind::Bundler {
            return None;
        }
        let file = cx.file.filter(|f| is_javascript_file(f))?;
        Some(vec![file.into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let file_name = deps.string(0)?;
        let host = env.host(ResolutionOption::Bundler);
        if host.module_kind_for_file(file_name).detected_kind != ModuleKind::Cjs {
            return Ok(Vec::new());
        }
        let Some(source) = host.get_source_file(file_name) else {
            return Ok(Vec::new());
        };

        let facts = commonjs_facts(&source);
        match facts.default_assignment {
            Some(span) if facts.es_module_marker && facts.assignments.is_empty() => {
                Ok(vec![Problem::CjsOnlyExportsDefault {
                    file_name: file_name.to_string(),
                    pos: span.start,
                    end: span.end,
                }])
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckOptions;
    use crate::package::Package;
    use crate::problem::ProblemKind;

    fn count(index_js: &str) -> usize {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [
                ("package.json", r#"{"name":"pkg","main":"index.js","types":"index.d.ts"}"#),
                ("index.js", index_js),
                ("index.d.ts", "declare const x: number;\nexport default x;"),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        crate::check_package(&pkg, &CheckOptions::new())
            .unwrap()
            .problems
            .iter()
            .filter(|p| p.kind() == ProblemKind::CjsOnlyExportsDefault)
            .count()
    }

    #[test]
    fn test_requires_marker_and_no_module_exports() {
        assert_eq!(count("exports.default = 1;\nexports.__esModule = true;\n"), 1);
        assert_eq!(count("exports.default = 1;\n"), 0);
        assert_eq!(
            count("module.exports = { default: 1 };\nexports.default = 1;\nexports.__esModule = true;\n"),
            0
        );
    }
}
