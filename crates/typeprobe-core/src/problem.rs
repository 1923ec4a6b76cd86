//! Findings about the package under test.

use crate::kinds::{ModuleKind, ModuleKindRecord, ResolutionKind, ResolutionMode, ResolutionOption};
use serde::Serialize;

/// A discrepancy between a package's types and its runtime behavior.
///
/// Problems are plain values: equal problems are the same finding, which is
/// what lets the engine store each one once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind")]
pub enum Problem {
    #[serde(rename_all = "camelCase")]
    NoResolution {
        entrypoint: String,
        resolution_kind: ResolutionKind,
    },
    #[serde(rename_all = "camelCase")]
    UntypedResolution {
        entrypoint: String,
        resolution_kind: ResolutionKind,
    },
    #[serde(rename = "CJSResolvesToESM", rename_all = "camelCase")]
    CjsResolvesToEsm {
        entrypoint: String,
        resolution_kind: ResolutionKind,
    },
    #[serde(rename_all = "camelCase")]
    FallbackCondition {
        entrypoint: String,
        resolution_kind: ResolutionKind,
    },
    #[serde(rename = "FalseESM", rename_all = "camelCase")]
    FalseEsm {
        types_file_name: String,
        implementation_file_name: String,
        types_module_kind: ModuleKindRecord,
        implementation_module_kind: ModuleKindRecord,
    },
    #[serde(rename = "FalseCJS", rename_all = "camelCase")]
    FalseCjs {
        types_file_name: String,
        implementation_file_name: String,
        types_module_kind: ModuleKindRecord,
        implementation_module_kind: ModuleKindRecord,
    },
    #[serde(rename_all = "camelCase")]
    NamedExports {
        types_file_name: String,
        implementation_file_name: String,
        is_missing_all_named: bool,
        missing: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    FalseExportDefault {
        types_file_name: String,
        implementation_file_name: String,
    },
    #[serde(rename_all = "camelCase")]
    MissingExportEquals {
        types_file_name: String,
        implementation_file_name: String,
    },
    #[serde(rename_all = "camelCase")]
    UnexpectedModuleSyntax {
        file_name: String,
        pos: u32,
        end: u32,
        module_kind: ModuleKindRecord,
        syntax: ModuleKind,
    },
    #[serde(rename = "CJSOnlyExportsDefault", rename_all = "camelCase")]
    CjsOnlyExportsDefault { file_name: String, pos: u32, end: u32 },
    #[serde(rename_all = "camelCase")]
    InternalResolutionError {
        resolution_option: ResolutionOption,
        file_name: String,
        pos: u32,
        end: u32,
        module_specifier: String,
        resolution_mode: ResolutionMode,
        trace: Vec<String>,
    },
}

/// The kind of a [`Problem`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProblemKind {
    NoResolution,
    UntypedResolution,
    #[serde(rename = "CJSResolvesToESM")]
    CjsResolvesToEsm,
    FallbackCondition,
    #[serde(rename = "FalseESM")]
    FalseEsm,
    #[serde(rename = "FalseCJS")]
    FalseCjs,
    NamedExports,
    FalseExportDefault,
    MissingExportEquals,
    UnexpectedModuleSyntax,
    #[serde(rename = "CJSOnlyExportsDefault")]
    CjsOnlyExportsDefault,
    InternalResolutionError,
}

impl ProblemKind {
    /// Every kind in reporting order.
    pub const ALL: [ProblemKind; 12] = [
        ProblemKind::NoResolution,
        ProblemKind::UntypedResolution,
        ProblemKind::CjsResolvesToEsm,
        ProblemKind::FallbackCondition,
        ProblemKind::FalseEsm,
        ProblemKind::FalseCjs,
        ProblemKind::NamedExports,
        ProblemKind::FalseExportDefault,
        ProblemKind::MissingExportEquals,
        ProblemKind::UnexpectedModuleSyntax,
        ProblemKind::CjsOnlyExportsDefault,
        ProblemKind::InternalResolutionError,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoResolution => "NoResolution",
            Self::UntypedResolution => "UntypedResolution",
            Self::CjsResolvesToEsm => "CJSResolvesToESM",
            Self::FallbackCondition => "FallbackCondition",
            Self::FalseEsm => "FalseESM",
            Self::FalseCjs => "FalseCJS",
            Self::NamedExports => "NamedExports",
            Self::FalseExportDefault => "FalseExportDefault",
            Self::MissingExportEquals => "MissingExportEquals",
            Self::UnexpectedModuleSyntax => "UnexpectedModuleSyntax",
            Self::CjsOnlyExportsDefault => "CJSOnlyExportsDefault",
            Self::InternalResolutionError => "InternalResolutionError",
        }
    }

    /// One-line explanation for human-readable output.
    #[must_use]
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NoResolution => "Resolution failed",
            Self::UntypedResolution => "No types",
            Self::CjsResolvesToEsm => "Requiring this entrypoint loads an ES module",
            Self::FallbackCondition => "Types resolved through a fallback condition",
            Self::FalseEsm => "Types are ESM, implementation is CJS",
            Self::FalseCjs => "Types are CJS, implementation is ESM",
            Self::NamedExports => "Named exports in the types do not exist at runtime",
            Self::FalseExportDefault => "Types declare a default export the implementation lacks",
            Self::MissingExportEquals => "Types are missing `export =` for the implementation's `module.exports`",
            Self::UnexpectedModuleSyntax => "File syntax contradicts its detected module kind",
            Self::CjsOnlyExportsDefault => "CommonJS module simulates a default export with `exports.default`",
            Self::InternalResolutionError => "An import inside the types fails to resolve",
        }
    }
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Problem {
    #[must_use]
    pub fn kind(&self) -> ProblemKind {
        match self {
            Self::NoResolution { .. } => ProblemKind::NoResolution,
            Self::UntypedResolution { .. } => ProblemKind::UntypedResolution,
            Self::CjsResolvesToEsm { .. } => ProblemKind::CjsResolvesToEsm,
            Self::FallbackCondition { .. } => ProblemKind::FallbackCondition,
            Self::FalseEsm { .. } => ProblemKind::FalseEsm,
            Self::FalseCjs { .. } => ProblemKind::FalseCjs,
            Self::NamedExports { .. } => ProblemKind::NamedExports,
            Self::FalseExportDefault { .. } => ProblemKind::FalseExportDefault,
            Self::MissingExportEquals { .. } => ProblemKind::MissingExportEquals,
            Self::UnexpectedModuleSyntax { .. } => ProblemKind::UnexpectedModuleSyntax,
            Self::CjsOnlyExportsDefault { .. } => ProblemKind::CjsOnlyExportsDefault,
            Self::InternalResolutionError { .. } => ProblemKind::InternalResolutionError,
        }
    }

    /// The file the problem points at, for file-anchored kinds.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::FalseEsm { types_file_name, .. }
            | Self::FalseCjs { types_file_name, .. }
            | Self::NamedExports { types_file_name, .. }
            | Self::FalseExportDefault { types_file_name, .. }
            | Self::MissingExportEquals { types_file_name, .. } => Some(types_file_name),
            Self::UnexpectedModuleSyntax { file_name, .. }
            | Self::CjsOnlyExportsDefault { file_name, .. }
            | Self::InternalResolutionError { file_name, .. } => Some(file_name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.kind().summary())?;
        match self {
            Self::NoResolution {
                entrypoint,
                resolution_kind,
            }
            | Self::UntypedResolution {
                entrypoint,
                resolution_kind,
            }
            | Self::CjsResolvesToEsm {
                entrypoint,
                resolution_kind,
            }
            | Self::FallbackCondition {
                entrypoint,
                resolution_kind,
            } => write!(f, " ({entrypoint}, {resolution_kind})"),
            Self::NamedExports { missing, .. } => {
                write!(f, " [{}] in {}", missing.join(", "), self.file_name().unwrap_or_default())
            }
            Self::UnexpectedModuleSyntax { file_name, pos, .. }
            | Self::CjsOnlyExportsDefault { file_name, pos, .. } => write!(f, " at {file_name}:{pos}"),
            Self::InternalResolutionError {
                file_name,
                pos,
                module_specifier,
                resolution_option,
                ..
            } => write!(f, " '{module_specifier}' at {file_name}:{pos} ({resolution_option})"),
            _ => write!(f, " in {}", self.file_name().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag_and_fields() {
        let problem = Problem::CjsResolvesToEsm {
            entrypoint: ".".into(),
            resolution_kind: ResolutionKind::DualCjs,
        };
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "CJSResolvesToESM", "entrypoint": ".", "resolutionKind": "dual-cjs" })
        );
        assert_eq!(problem.kind().as_str(), "CJSResolvesToESM");
    }

    #[test]
    fn test_named_exports_payload() {
        let problem = Problem::NamedExports {
            types_file_name: "/t.d.ts".into(),
            implementation_file_name: "/i.js".into(),
            is_missing_all_named: true,
            missing: vec!["foo".into()],
        };
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["isMissingAllNamed"], true);
        assert_eq!(json["missing"][0], "foo");
        assert_eq!(problem.to_string(), "NamedExports: Named exports in the types do not exist at runtime [foo] in /t.d.ts");
    }

    #[test]
    fn test_kind_names_match_serialized_tags() {
        for kind in ProblemKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
