//! `package.json` `exports`/`imports` map evaluation.
//!
//! Shared by the type-level hosts and the runtime namespace resolver. The
//! two differ only in which conditions match and in what happens when a
//! matched condition's target does not load: the type-level algorithm falls
//! through to the next condition, Node stops.
//!
//! Conditions are walked in object order, so manifests must be parsed with
//! `serde_json`'s `preserve_order` feature.

use super::trace::ResolveTrace;
use serde_json::{Map, Value};

/// The condition set a resolution matches against.
#[derive(Debug, Clone, Copy)]
pub struct Conditions<'a> {
    pub names: &'a [&'a str],
    /// Continue with the next condition when a matched target fails.
    pub fall_through: bool,
}

impl Conditions<'_> {
    /// `default` always matches.
    #[must_use]
    pub fn matches(&self, condition: &str) -> bool {
        condition == "default" || self.names.contains(&condition)
    }
}

/// Whether every key at this level is a subpath (`.` or `./x`).
///
/// Only the first key is inspected; mixed maps are invalid anyway.
#[must_use]
pub fn is_subpath_map(map: &Map<String, Value>) -> bool {
    map.keys().next().is_some_and(|k| k.starts_with('.'))
}

/// The `exports` entry matching `subpath`, plus the `*` substitution when a
/// pattern key matched.
///
/// String, array and conditions-object sugar all stand for `{ ".": ... }`.
#[must_use]
pub fn exports_entry<'v>(exports: &'v Value, subpath: &str) -> Option<(&'v Value, Option<String>)> {
    match exports {
        Value::Object(map) if is_subpath_map(map) => match_key(map, subpath),
        Value::Object(_) | Value::String(_) | Value::Array(_) if subpath == "." => {
            Some((exports, None))
        }
        _ => None,
    }
}

/// Look up `key` in an exports or imports map: an exact key first, then the
/// most specific single-`*` pattern.
#[must_use]
pub fn match_key<'v>(map: &'v Map<String, Value>, key: &str) -> Option<(&'v Value, Option<String>)> {
    if let Some(value) = map.get(key).filter(|_| !key.contains('*')) {
        return Some((value, None));
    }

    let mut best: Option<(&str, &Value, String)> = None;
    for (pattern, value) in map {
        if pattern.matches('*').count() != 1 {
            continue;
        }
        let Some(star) = match_pattern(pattern, key) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((current, _, _)) => {
                pattern.len() > current.len()
                    || (pattern.len() == current.len() && pattern.as_str() < *current)
            }
        };
        if better {
            best = Some((pattern.as_str(), value, star));
        }
    }
    best.map(|(_, value, star)| (value, Some(star)))
}

/// Match a single-`*` pattern key against a subpath, returning what `*`
/// stands for. `"./features/*.js"` against `"./features/a/b.js"` gives `"a/b"`.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let star_pos = pattern.find('*')?;
    let prefix = &pattern[..star_pos];
    let suffix = &pattern[star_pos + 1..];

    if !subpath.starts_with(prefix) || !subpath.ends_with(suffix) {
        return None;
    }
    let start = prefix.len();
    let end = subpath.len().checked_sub(suffix.len())?;
    if start >= end {
        return None;
    }
    Some(subpath[start..end].to_string())
}

/// Substitute every `*` in a target. Targets must stay inside the package.
fn substitute_star(target: &str, star: Option<&str>) -> Option<String> {
    let result = match star {
        Some(star) => target.replace('*', star),
        None => target.to_string(),
    };
    if !result.starts_with("./") {
        return None;
    }
    if result
        .split('/')
        .any(|segment| segment == ".." || segment == "node_modules")
    {
        return None;
    }
    Some(result)
}

/// Evaluate an exports target: a path string, a fallback array, a
/// conditions object, or `null`.
///
/// `load` receives the package-relative path (`./dist/index.js`) and returns
/// the resolved file name, if any.
pub fn resolve_target<F>(
    target: &Value,
    star: Option<&str>,
    conditions: &Conditions<'_>,
    trace: &mut ResolveTrace,
    load: &mut F,
) -> Option<String>
where
    F: FnMut(&str, &mut ResolveTrace) -> Option<String>,
{
    match target {
        Value::String(path) => {
            let Some(path) = substitute_star(path, star) else {
                trace.push(format!("Invalid target '{path}' in 'exports'."));
                return None;
            };
            trace.push(format!("Using 'exports' target '{path}'."));
            load(&path, trace)
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_target(item, star, conditions, trace, load)),
        Value::Object(map) => {
            trace.entering_conditions();
            let mut resolved = None;
            for (condition, value) in map {
                if !conditions.matches(condition) {
                    trace.non_matching_condition(condition);
                    continue;
                }
                trace.matched_condition(condition);
                if let Some(file) = resolve_target(value, star, conditions, trace, load) {
                    trace.resolved_condition(condition);
                    resolved = Some(file);
                    break;
                }
                trace.failed_condition(condition);
                if !conditions.fall_through {
                    break;
                }
            }
            trace.exiting_conditions();
            resolved
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TYPES_IMPORT: Conditions<'static> = Conditions {
        names: &["types", "import"],
        fall_through: true,
    };

    fn resolve_with(exports: &Value, subpath: &str, conditions: &Conditions<'_>, present: &[&str]) -> (Option<String>, Vec<String>) {
        let mut trace = ResolveTrace::new();
        let result = exports_entry(exports, subpath).and_then(|(target, star)| {
            resolve_target(target, star.as_deref(), conditions, &mut trace, &mut |path, _| {
                present.contains(&path).then(|| path.to_string())
            })
        });
        (result, trace.into_lines())
    }

    #[test]
    fn test_sugar_forms_are_root() {
        let exports = json!("./index.js");
        assert_eq!(resolve_with(&exports, ".", &TYPES_IMPORT, &["./index.js"]).0.as_deref(), Some("./index.js"));
        assert!(exports_entry(&exports, "./sub").is_none());

        let exports = json!({ "import": "./esm.js", "default": "./cjs.js" });
        assert_eq!(resolve_with(&exports, ".", &TYPES_IMPORT, &["./esm.js"]).0.as_deref(), Some("./esm.js"));
    }

    #[test]
    fn test_conditions_walk_in_object_order() {
        let exports = json!({ ".": { "default": "./d.js", "import": "./esm.js" } });
        let (result, _) = resolve_with(&exports, ".", &TYPES_IMPORT, &["./d.js", "./esm.js"]);
        assert_eq!(result.as_deref(), Some("./d.js"));
    }

    #[test]
    fn test_fall_through_on_failed_condition() {
        let exports = json!({ ".": { "import": "./missing.js", "require": "./cjs.js", "default": "./d.js" } });
        let (result, trace) = resolve_with(&exports, ".", &TYPES_IMPORT, &["./d.js"]);
        assert_eq!(result.as_deref(), Some("./d.js"));
        assert!(trace.contains(&"Failed to resolve under condition 'import'.".to_string()));
        assert!(trace.contains(&"Saw non-matching condition 'require'.".to_string()));
        assert!(trace.contains(&"Resolved under condition 'default'.".to_string()));

        let node = Conditions {
            names: &["node", "import"],
            fall_through: false,
        };
        let (result, trace) = resolve_with(&exports, ".", &node, &["./d.js"]);
        assert_eq!(result, None);
        assert_eq!(trace.last().map(String::as_str), Some("Exiting conditional exports."));
    }

    #[test]
    fn test_pattern_specificity_and_substitution() {
        let exports = json!({
            "./*": "./dist/*.js",
            "./features/*": "./dist/features/*.js",
            "./internal/*": null
        });
        let (result, _) = resolve_with(&exports, "./features/a", &TYPES_IMPORT, &["./dist/features/a.js"]);
        assert_eq!(result.as_deref(), Some("./dist/features/a.js"));
        let (result, _) = resolve_with(&exports, "./internal/x", &TYPES_IMPORT, &["./dist/internal/x.js"]);
        assert_eq!(result, None);
    }

    #[test]
    fn test_exact_key_beats_pattern() {
        let exports = json!({ "./*": "./dist/*.js", "./a": "./special.js" });
        let (result, _) = resolve_with(&exports, "./a", &TYPES_IMPORT, &["./special.js", "./dist/a.js"]);
        assert_eq!(result.as_deref(), Some("./special.js"));
    }

    #[test]
    fn test_targets_must_stay_in_package() {
        let exports = json!({ ".": "../outside.js", "./x": "/abs.js", "./y/*": "./lib/*" });
        assert_eq!(resolve_with(&exports, ".", &TYPES_IMPORT, &["../outside.js"]).0, None);
        assert_eq!(resolve_with(&exports, "./x", &TYPES_IMPORT, &["/abs.js"]).0, None);
        assert_eq!(resolve_with(&exports, "./y/../../z", &TYPES_IMPORT, &[]).0, None);
    }

    #[test]
    fn test_array_targets_take_first_loadable() {
        let exports = json!({ ".": ["./missing.js", "./present.js"] });
        let (result, _) = resolve_with(&exports, ".", &TYPES_IMPORT, &["./present.js"]);
        assert_eq!(result.as_deref(), Some("./present.js"));
    }

    #[test]
    fn test_subpath_map_detection() {
        assert!(is_subpath_map(json!({ ".": "./a.js" }).as_object().unwrap_or(&Map::new())));
        assert!(!is_subpath_map(json!({ "import": "./a.js" }).as_object().unwrap_or(&Map::new())));
    }
}
