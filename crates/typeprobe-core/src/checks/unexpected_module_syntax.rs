use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::kinds::{is_javascript_file, ModuleKind, ResolutionOption};
use crate::problem::Problem;

/// JavaScript whose own syntax contradicts the module kind it will be
/// loaded as. Classic resolution has no module kind detection to
/// contradict, so it is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnexpectedModuleSyntax;

impl Check for UnexpectedModuleSyntax {
    fn name(&self) -> &'static str {
        "UnexpectedModuleSyntax"
    }

    fn enumerate_files(&self) -> bool {
        true
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        let file = cx.file.filter(|f| is_javascript_file(f))?;
        if cx.option() == ResolutionOption::Classic {
            return None;
        }
        Some(vec![file.into(), cx.option().into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let file_name = deps.string(0)?;
        let host = env.host(deps.option(1)?);
        let Some(source) = host.get_source_file(file_name) else {
            return Ok(Vec::new());
        };

        let (syntax, span) = match (source.esm_indicator, source.cjs_indicator) {
            (Some(span), _) => (ModuleKind::Esm, span),
            (None, Some(span)) => (ModuleKind::Cjs, span),
            (None, None) => return Ok(Vec::new()),
        };
        let module_kind = host.module_kind_for_file(file_name);
        if module_kind.detected_kind == syntax {
            return Ok(Vec::new());
        }
        Ok(vec![Problem::UnexpectedModuleSyntax {
            file_name: file_name.to_string(),
            pos: span.start,
            end: span.end,
            module_kind,
            syntax,
        }])
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckOptions;
    use crate::kinds::ModuleKind;
    use crate::package::Package;
    use crate::problem::Problem;

    #[test]
    fn test_esm_syntax_in_commonjs_file() {
        let source = "const x = 1;\nexport default x;\n";
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [
                ("package.json", r#"{"name":"pkg","main":"index.js","types":"index.d.ts"}"#),
                ("index.js", source),
                ("index.d.ts", "declare const x: number;\nexport default x;"),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let analysis = crate::check_package(&pkg, &CheckOptions::new()).unwrap();
        let found: Vec<&Problem> = analysis
            .problems
            .iter()
            .filter(|p| matches!(p, Problem::UnexpectedModuleSyntax { .. }))
            .collect();
        assert_eq!(found.len(), 1);
        let Problem::UnexpectedModuleSyntax {
            file_name,
            pos,
            module_kind,
            syntax,
            ..
        } = found[0]
        else {
            unreachable!()
        };
        assert_eq!(file_name, "/node_modules/pkg/index.js");
        assert_eq!(*pos as usize, source.find("export").unwrap());
        assert_eq!(module_kind.detected_kind, ModuleKind::Cjs);
        assert_eq!(*syntax, ModuleKind::Esm);
    }
}
