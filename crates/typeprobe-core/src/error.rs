use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type for typeprobe.
///
/// These are engine failures, never findings about the package under test:
/// findings are reported as [`crate::Problem`] values.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    PackageJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("File not found in package: {0}")]
    MissingFile(String),

    #[error("Invalid entrypoint pattern '{pattern}': {message}")]
    EntrypointPattern { pattern: String, message: String },

    #[error("Cannot resolve '{specifier}' from {from}")]
    Namespace { specifier: String, from: String },

    /// The engine's own bookkeeping was violated. Always a bug.
    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[must_use]
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}
