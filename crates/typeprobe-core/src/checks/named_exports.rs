use super::typed_pair;
use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::kinds::{ModuleKind, ResolutionKind, ResolutionOption};
use crate::namespace::{file_url, resolve_namespace};
use crate::problem::Problem;

/// Named imports of a CommonJS module from ESM only work for names Node's
/// static analysis finds. Every value the types promise must be among them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedExports;

impl Check for NamedExports {
    fn name(&self) -> &'static str {
        "NamedExports"
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        if cx.kind != ResolutionKind::DualEsm {
            return None;
        }
        let (types, implementation) = typed_pair(cx)?;
        Some(vec![types.into(), implementation.into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let types_file_name = deps.string(0)?;
        let implementation_file_name = deps.string(1)?;
        let host = env.host(ResolutionOption::Dual);
        let is_cjs = |file: &str| host.module_kind_for_file(file).detected_kind == ModuleKind::Cjs;
        if !is_cjs(types_file_name) || !is_cjs(implementation_file_name) {
            return Ok(Vec::new());
        }

        let symbols = host.module_symbols(types_file_name);
        let mut expected: Vec<&str> = Vec::new();
        for name in symbols.value_names() {
            if name != "__esModule" && !expected.contains(&name) {
                expected.push(name);
            }
        }
        if expected.is_empty() {
            return Ok(Vec::new());
        }

        let from = file_url("/")?;
        let runtime = match resolve_namespace(env.package(), implementation_file_name, &from) {
            Ok(names) => names,
            Err(err) => {
                tracing::debug!(file = implementation_file_name, error = %err, "namespace unavailable");
                return Ok(Vec::new());
            }
        };

        let missing: Vec<String> = expected
            .iter()
            .filter(|name| !runtime.iter().any(|r| r == *name))
            .map(|name| (*name).to_string())
            .collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }
        let missing_named = missing.iter().filter(|n| *n != "default").count();
        let expected_named = expected.iter().filter(|n| **n != "default").count();
        let is_missing_all_named = missing_named == expected_named;

        Ok(vec![Problem::NamedExports {
            types_file_name: types_file_name.to_string(),
            implementation_file_name: implementation_file_name.to_string(),
            is_missing_all_named,
            missing,
        }])
    }
}
