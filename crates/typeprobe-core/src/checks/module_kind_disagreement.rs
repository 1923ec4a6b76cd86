use super::typed_pair;
use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::kinds::ModuleKind;
use crate::problem::Problem;

/// Types and implementation must agree on CommonJS vs ESM.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleKindDisagreement;

impl Check for ModuleKindDisagreement {
    fn name(&self) -> &'static str {
        "ModuleKindDisagreement"
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        let (types, implementation) = typed_pair(cx)?;
        Some(vec![types.into(), implementation.into(), cx.option().into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let types_file_name = deps.string(0)?.to_string();
        let implementation_file_name = deps.string(1)?.to_string();
        let host = env.host(deps.option(2)?);

        let types_module_kind = host.module_kind_for_file(&types_file_name);
        let implementation_module_kind = host.module_kind_for_file(&implementation_file_name);
        let problem = match (
            types_module_kind.detected_kind,
            implementation_module_kind.detected_kind,
        ) {
            (ModuleKind::Esm, ModuleKind::Cjs) => Problem::FalseEsm {
                types_file_name,
                implementation_file_name,
                types_module_kind,
                implementation_module_kind,
            },
            (ModuleKind::Cjs, ModuleKind::Esm) => Problem::FalseCjs {
                types_file_name,
                implementation_file_name,
                types_module_kind,
                implementation_module_kind,
            },
            _ => return Ok(Vec::new()),
        };
        Ok(vec![problem])
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckOptions;
    use crate::kinds::{DetectedReason, ModuleKind, ResolutionKind};
    use crate::package::Package;
    use crate::problem::{Problem, ProblemKind};

    #[test]
    fn test_false_cjs_under_type_module() {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [
                ("package.json", r#"{"name":"pkg","type":"module","main":"index.js","types":"index.d.cts"}"#),
                ("index.js", "export const a = 1;"),
                ("index.d.cts", "export declare const a: number;"),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let analysis = crate::check_package(&pkg, &CheckOptions::new()).unwrap();
        let false_cjs: Vec<&Problem> = analysis
            .problems
            .iter()
            .filter(|p| p.kind() == ProblemKind::FalseCjs)
            .collect();
        assert_eq!(false_cjs.len(), 1);
        let Problem::FalseCjs {
            types_module_kind,
            implementation_module_kind,
            ..
        } = false_cjs[0]
        else {
            unreachable!()
        };
        assert_eq!(types_module_kind.detected_reason, DetectedReason::Extension);
        assert_eq!(implementation_module_kind.detected_kind, ModuleKind::Esm);
        assert_eq!(implementation_module_kind.detected_reason, DetectedReason::PackageTypeField);
    }

    #[test]
    fn test_false_esm_for_commonjs_main() {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [
                ("package.json", r#"{"name":"pkg","main":"index.js","types":"index.d.mts"}"#),
                ("index.js", "exports.a = 1;"),
                ("index.d.mts", "export declare const a: number;"),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let analysis = crate::check_package(&pkg, &CheckOptions::new()).unwrap();
        let dual_cjs = analysis.entrypoints[0]
            .cell(ResolutionKind::DualCjs)
            .unwrap();
        let false_esm: Vec<&Problem> = dual_cjs
            .visible_problems
            .iter()
            .map(|&i| &analysis.problems[i])
            .filter(|p| p.kind() == ProblemKind::FalseEsm)
            .collect();
        assert_eq!(false_esm.len(), 1);
        let Problem::FalseEsm {
            types_file_name,
            implementation_file_name,
            types_module_kind,
            implementation_module_kind,
        } = false_esm[0]
        else {
            unreachable!()
        };
        assert_eq!(types_file_name, "/node_modules/pkg/index.d.mts");
        assert_eq!(implementation_file_name, "/node_modules/pkg/index.js");
        assert_eq!(types_module_kind.detected_kind, ModuleKind::Esm);
        assert_eq!(types_module_kind.detected_reason, DetectedReason::Extension);
        assert_eq!(implementation_module_kind.detected_kind, ModuleKind::Cjs);
        assert!(analysis.problems.iter().all(|p| p.kind() != ProblemKind::FalseCjs));
    }
}
