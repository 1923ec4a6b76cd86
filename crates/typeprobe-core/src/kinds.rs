//! Shared vocabulary: resolution kinds, algorithms, modes and module kinds.

use serde::{Deserialize, Serialize};

/// One of the four consumer-facing resolution behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionKind {
    Classic,
    DualCjs,
    DualEsm,
    Bundler,
}

impl ResolutionKind {
    /// Every kind, in matrix order.
    pub const ALL: [ResolutionKind; 4] = [
        ResolutionKind::Classic,
        ResolutionKind::DualCjs,
        ResolutionKind::DualEsm,
        ResolutionKind::Bundler,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::DualCjs => "dual-cjs",
            Self::DualEsm => "dual-esm",
            Self::Bundler => "bundler",
        }
    }

    /// The algorithm backing this kind.
    #[must_use]
    pub fn option(&self) -> ResolutionOption {
        match self {
            Self::Classic => ResolutionOption::Classic,
            Self::DualCjs | Self::DualEsm => ResolutionOption::Dual,
            Self::Bundler => ResolutionOption::Bundler,
        }
    }

    /// The resolution mode an importing file has under this kind.
    #[must_use]
    pub fn mode(&self) -> ResolutionMode {
        match self {
            Self::Classic | Self::DualCjs => ResolutionMode::Require,
            Self::DualEsm | Self::Bundler => ResolutionMode::Import,
        }
    }

    /// Name of the synthetic importing file used to resolve entrypoints.
    #[must_use]
    pub fn importing_file(&self) -> &'static str {
        match self {
            Self::DualEsm => "/index.mts",
            _ => "/index.ts",
        }
    }
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three underlying resolution algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionOption {
    Classic,
    Dual,
    Bundler,
}

impl ResolutionOption {
    pub const ALL: [ResolutionOption; 3] = [
        ResolutionOption::Classic,
        ResolutionOption::Dual,
        ResolutionOption::Bundler,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Dual => "dual",
            Self::Bundler => "bundler",
        }
    }

    /// Whether `package.json` `exports` and `imports` are honored.
    #[must_use]
    pub fn uses_exports(&self) -> bool {
        !matches!(self, Self::Classic)
    }
}

impl std::fmt::Display for ResolutionOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of import being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// ES module import (`import` condition).
    Import,
    /// CommonJS require (`require` condition).
    Require,
}

impl ResolutionMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Require => "require",
        }
    }
}

/// CommonJS or ECMAScript module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Esm,
    Cjs,
}

impl ModuleKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esm => "esm",
            Self::Cjs => "cjs",
        }
    }
}

/// Why a file received its module kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectedReason {
    Extension,
    PackageTypeField,
    Default,
}

/// Detected module kind of one file under one resolution option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleKindRecord {
    pub detected_kind: ModuleKind,
    pub detected_reason: DetectedReason,
    pub reason_file_name: String,
}

/// A successful resolution of a specifier to a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub file_name: String,
    pub is_typescript: bool,
    pub is_json: bool,
    pub trace: Vec<String>,
}

/// Extensions that carry types.
const TS_EXTENSIONS: &[&str] = &[".d.ts", ".d.mts", ".d.cts", ".ts", ".tsx", ".mts", ".cts"];

/// Whether a file name has a TypeScript (type-bearing) extension.
#[must_use]
pub fn is_typescript_file(file_name: &str) -> bool {
    TS_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext))
}

/// Whether a file name is a declaration file (`.d.ts`, `.d.mts`, `.d.cts`).
#[must_use]
pub fn is_declaration_file(file_name: &str) -> bool {
    file_name.ends_with(".d.ts") || file_name.ends_with(".d.mts") || file_name.ends_with(".d.cts")
}

/// Whether a file name is JavaScript.
#[must_use]
pub fn is_javascript_file(file_name: &str) -> bool {
    [".js", ".mjs", ".cjs", ".jsx"]
        .iter()
        .any(|ext| file_name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_to_option_and_mode() {
        assert_eq!(ResolutionKind::DualCjs.option(), ResolutionOption::Dual);
        assert_eq!(ResolutionKind::DualEsm.option(), ResolutionOption::Dual);
        assert_eq!(ResolutionKind::DualCjs.mode(), ResolutionMode::Require);
        assert_eq!(ResolutionKind::DualEsm.mode(), ResolutionMode::Import);
        assert_eq!(ResolutionKind::DualEsm.importing_file(), "/index.mts");
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ResolutionKind::DualCjs).unwrap();
        assert_eq!(json, "\"dual-cjs\"");
        let reason = serde_json::to_string(&DetectedReason::PackageTypeField).unwrap();
        assert_eq!(reason, "\"package-type-field\"");
    }

    #[test]
    fn test_file_classification() {
        assert!(is_typescript_file("/a/index.d.mts"));
        assert!(is_declaration_file("/a/index.d.cts"));
        assert!(!is_declaration_file("/a/index.ts"));
        assert!(is_javascript_file("/a/index.cjs"));
        assert!(!is_typescript_file("/a/index.js"));
    }

    #[test]
    fn test_resolution_mode_is_import_or_require() {
        assert_eq!(serde_json::to_string(&ResolutionMode::Import).unwrap(), "\"import\"");
        assert_eq!(ResolutionMode::Require.as_str(), "require");
        assert!(serde_json::from_str::<ResolutionMode>("\"unknown\"").is_err());
    }
}
