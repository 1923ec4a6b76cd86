use super::typed_pair;
use crate::config::HeuristicOptions;
use crate::engine::{Check, CheckContext, CheckEnv, Dependency, DependencyList};
use crate::error::Result;
use crate::host::Host;
use crate::kinds::ModuleKind;
use crate::lexers::{cjs, ModuleExports};
use crate::problem::Problem;
use crate::syntax::{commonjs_facts, AssignedValue, CommonJsFacts, SourceFile};
use std::cell::OnceCell;
use std::rc::Rc;

/// A `default` export in the types must correspond to something the
/// CommonJS implementation exposes, and an implementation that assigns
/// `module.exports` needs `export =` in its types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportDefaultDisagreement;

impl Check for ExportDefaultDisagreement {
    fn name(&self) -> &'static str {
        "ExportDefaultDisagreement"
    }

    fn dependencies(&self, cx: &CheckContext<'_>, _env: &CheckEnv<'_>) -> Option<Vec<Dependency>> {
        let (types, implementation) = typed_pair(cx)?;
        Some(vec![types.into(), implementation.into(), cx.option().into()])
    }

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>> {
        let types_file_name = deps.string(0)?;
        let implementation_file_name = deps.string(1)?;
        let host = env.host(deps.option(2)?);

        let is_esm = |file: &str| host.module_kind_for_file(file).detected_kind == ModuleKind::Esm;
        if is_esm(types_file_name) || is_esm(implementation_file_name) {
            return Ok(Vec::new());
        }
        let symbols = host.module_symbols(types_file_name);
        if symbols.export_equals.is_some() || !symbols.has_default() {
            return Ok(Vec::new());
        }
        let Some(source) = host.get_source_file(implementation_file_name) else {
            return Ok(Vec::new());
        };

        let implementation = Implementation::new(host, source, &env.options.heuristics);
        if implementation.facts().assignment_scopes() >= env.options.heuristics.bundle_assignment_sites {
            tracing::debug!(file = implementation_file_name, "module.exports assigned in several scopes; skipping");
            return Ok(Vec::new());
        }

        let problem = if !implementation.probably_has_default() {
            Problem::FalseExportDefault {
                types_file_name: types_file_name.to_string(),
                implementation_file_name: implementation_file_name.to_string(),
            }
        } else if implementation.exposes_module_exports_with_default()
            && (implementation.target_is_callable() || implementation.has_other_named_exports())
        {
            Problem::MissingExportEquals {
                types_file_name: types_file_name.to_string(),
                implementation_file_name: implementation_file_name.to_string(),
            }
        } else {
            return Ok(Vec::new());
        };
        Ok(vec![problem])
    }
}

/// Facts about the implementation file, each computed on first use.
struct Implementation<'a> {
    host: &'a Host<'a>,
    source: Rc<SourceFile>,
    heuristics: &'a HeuristicOptions,
    facts: OnceCell<CommonJsFacts>,
    lexed: OnceCell<ModuleExports>,
}

impl<'a> Implementation<'a> {
    fn new(host: &'a Host<'a>, source: Rc<SourceFile>, heuristics: &'a HeuristicOptions) -> Self {
        Self {
            host,
            source,
            heuristics,
            facts: OnceCell::new(),
            lexed: OnceCell::new(),
        }
    }

    fn facts(&self) -> &CommonJsFacts {
        self.facts.get_or_init(|| commonjs_facts(&self.source))
    }

    fn lexed(&self) -> &ModuleExports {
        self.lexed
            .get_or_init(|| cjs::lex_tokens(&self.source.text, &self.source.tokens))
    }

    /// The value `module.exports` ends up holding, when assigned.
    fn assigned(&self) -> Option<&AssignedValue> {
        self.facts().assignments.last().map(|a| &a.value)
    }

    /// Property names of the `module.exports` target.
    fn target_properties(&self) -> Vec<&str> {
        match self.assigned() {
            Some(AssignedValue::Object(keys)) => keys.iter().map(String::as_str).collect(),
            Some(AssignedValue::Identifier(name)) => self.facts().properties_of(name).collect(),
            _ => Vec::new(),
        }
    }

    fn has_default(&self) -> bool {
        self.lexed().has_name("default")
            || self.facts().default_assignment.is_some()
            || self.target_properties().contains(&"default")
    }

    fn is_minified(&self) -> bool {
        let text = &self.source.text;
        cjs::matches_bundler_fingerprint(text)
            || text
                .lines()
                .any(|line| line.len() >= self.heuristics.minified_line_length)
    }

    /// Minified output hides its exports from the lexer; give it the benefit
    /// of the doubt when nothing at all was recognized.
    fn probably_has_default(&self) -> bool {
        self.has_default() || (self.is_minified() && self.lexed().is_empty())
    }

    fn exposes_module_exports_with_default(&self) -> bool {
        !self.facts().assignments.is_empty() && self.has_default()
    }

    fn target_is_callable(&self) -> bool {
        match self.assigned() {
            Some(AssignedValue::Callable) => true,
            Some(AssignedValue::Identifier(name)) => self
                .source
                .declarations()
                .locals
                .get(name)
                .is_some_and(|symbol| symbol.callable),
            _ => false,
        }
    }

    fn has_other_named_exports(&self) -> bool {
        let is_other = |name: &str| name != "default" && name != "__esModule";
        self.target_properties().into_iter().any(is_other)
            || self.lexed().exported_names.iter().any(|n| is_other(n))
    }
}

impl std::fmt::Debug for Implementation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Implementation")
            .field("file", &self.source.file_name)
            .field("option", &self.host.option())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CheckOptions;
    use crate::package::Package;
    use crate::problem::ProblemKind;

    fn kinds(index_js: &str, index_dts: &str) -> Vec<ProblemKind> {
        let pkg = Package::new(
            "pkg",
            "1.0.0",
            [
                ("package.json", r#"{"name":"pkg","main":"index.js","types":"index.d.ts"}"#),
                ("index.js", index_js),
                ("index.d.ts", index_dts),
            ]
            .iter()
            .map(|(p, t)| ((*p).to_string(), (*t).to_string())),
        );
        let mut kinds: Vec<ProblemKind> = crate::check_package(&pkg, &CheckOptions::new())
            .unwrap()
            .problems
            .iter()
            .map(crate::problem::Problem::kind)
            .filter(|k| matches!(k, ProblemKind::FalseExportDefault | ProblemKind::MissingExportEquals))
            .collect();
        kinds.dedup();
        kinds
    }

    const DEFAULT_TYPES: &str = "declare function f(): void;\nexport default f;";

    #[test]
    fn test_false_export_default() {
        assert_eq!(
            kinds("exports.a = 1;", DEFAULT_TYPES),
            vec![ProblemKind::FalseExportDefault]
        );
    }

    #[test]
    fn test_missing_export_equals() {
        assert_eq!(
            kinds("function f() {}\nf.default = f;\nmodule.exports = f;", DEFAULT_TYPES),
            vec![ProblemKind::MissingExportEquals]
        );
    }

    #[test]
    fn test_transpiled_default_is_fine() {
        assert!(kinds("exports.__esModule = true;\nexports.default = function f() {};", DEFAULT_TYPES).is_empty());
    }

    #[test]
    fn test_export_equals_types_abstain() {
        assert!(kinds("exports.a = 1;", "declare const a: number;\nexport = a;").is_empty());
    }

    #[test]
    fn test_bundle_with_many_assignment_sites_abstains() {
        let bundle = "(function () { module.exports = 1; })();\n(function () { module.exports = 2; })();";
        assert!(kinds(bundle, DEFAULT_TYPES).is_empty());
    }

    #[test]
    fn test_minified_source_probably_has_default() {
        let minified = format!("var a={};{}", "0".repeat(1200), ";");
        assert!(kinds(&minified, DEFAULT_TYPES).is_empty());
    }
}
