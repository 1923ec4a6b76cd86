//! Check configuration.
//!
//! `CheckOptions` is plain serde data so it can be read from a
//! `.typeprobe.json` file and then adjusted with `with_*` builders.

use crate::error::{Error, Result};
use crate::kinds::ResolutionKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling entrypoint discovery and heuristics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckOptions {
    /// Explicit entrypoints. Replaces discovery entirely when non-empty.
    pub entrypoints: Vec<String>,

    /// Subpaths added to the discovered set.
    pub include_entrypoints: Vec<String>,

    /// Subpaths removed from the discovered set.
    pub exclude_entrypoints: Vec<EntrypointFilter>,

    /// Without an `exports` map, treat every published source file as an entrypoint.
    pub entrypoints_legacy: bool,

    /// Resolution kinds that produce inert cells.
    pub exclude_resolution_kinds: Vec<ResolutionKind>,

    pub heuristics: HeuristicOptions,
}

/// An exact subpath or a regular expression over subpaths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrypointFilter {
    Exact(String),
    Pattern { pattern: String },
}

impl EntrypointFilter {
    /// Build a pattern filter, validating the regular expression.
    pub fn pattern(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        regex_lite::Regex::new(&pattern).map_err(|e| Error::EntrypointPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::Pattern { pattern })
    }
}

/// Thresholds for the export-default heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeuristicOptions {
    /// Distinct function bodies assigning `module.exports` at which a file
    /// is treated as an unanalyzable bundle.
    pub bundle_assignment_sites: usize,

    /// A line at least this long marks a file as minified.
    pub minified_line_length: usize,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            bundle_assignment_sites: 2,
            minified_line_length: 1000,
        }
    }
}

impl CheckOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Self = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check that every exclusion pattern compiles.
    pub fn validate(&self) -> Result<()> {
        for filter in &self.exclude_entrypoints {
            if let EntrypointFilter::Pattern { pattern } = filter {
                EntrypointFilter::pattern(pattern.clone())?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_entrypoints(mut self, entrypoints: Vec<String>) -> Self {
        self.entrypoints = entrypoints;
        self
    }

    #[must_use]
    pub fn with_include_entrypoints(mut self, include: Vec<String>) -> Self {
        self.include_entrypoints = include;
        self
    }

    #[must_use]
    pub fn with_exclude_entrypoints(mut self, exclude: Vec<EntrypointFilter>) -> Self {
        self.exclude_entrypoints = exclude;
        self
    }

    #[must_use]
    pub fn with_entrypoints_legacy(mut self, legacy: bool) -> Self {
        self.entrypoints_legacy = legacy;
        self
    }

    #[must_use]
    pub fn with_excluded_resolution_kinds(mut self, kinds: Vec<ResolutionKind>) -> Self {
        self.exclude_resolution_kinds = kinds;
        self
    }

    #[must_use]
    pub fn with_heuristics(mut self, heuristics: HeuristicOptions) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Whether a resolution kind was disabled.
    #[must_use]
    pub fn is_kind_disabled(&self, kind: ResolutionKind) -> bool {
        self.exclude_resolution_kinds.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_heuristic_defaults() {
        let options = CheckOptions::new();
        assert_eq!(options.heuristics.bundle_assignment_sites, 2);
        assert_eq!(options.heuristics.minified_line_length, 1000);
        assert!(options.entrypoints.is_empty());
    }

    #[test]
    fn test_parse_camel_case_with_filters() {
        let options: CheckOptions = serde_json::from_str(
            r#"{
                "excludeEntrypoints": ["./internal", { "pattern": "^\\./legacy/" }],
                "excludeResolutionKinds": ["classic"],
                "heuristics": { "minifiedLineLength": 500 }
            }"#,
        )
        .unwrap();
        assert_eq!(
            options.exclude_entrypoints,
            vec![
                EntrypointFilter::Exact("./internal".into()),
                EntrypointFilter::Pattern {
                    pattern: "^\\./legacy/".into()
                },
            ]
        );
        assert!(options.is_kind_disabled(ResolutionKind::Classic));
        assert_eq!(options.heuristics.minified_line_length, 500);
        assert_eq!(options.heuristics.bundle_assignment_sites, 2);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(EntrypointFilter::pattern("(unclosed").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "entrypointsLegacy": true }"#).unwrap();
        file.flush().unwrap();

        let options = CheckOptions::from_json_file(file.path()).unwrap();
        assert!(options.entrypoints_legacy);
    }

    #[test]
    fn test_from_json_file_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        file.flush().unwrap();

        let err = CheckOptions::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
