//! Memo keys.

use crate::error::{Error, Result};
use crate::kinds::{ResolutionKind, ResolutionMode, ResolutionOption};

/// One input a check declares. Only hashable shapes exist, so every
/// dependency list is a valid memo key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    Str(String),
    OptStr(Option<String>),
    Kind(ResolutionKind),
    Option(ResolutionOption),
    Mode(ResolutionMode),
}

impl From<&str> for Dependency {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Dependency {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Option<&str>> for Dependency {
    fn from(value: Option<&str>) -> Self {
        Self::OptStr(value.map(str::to_string))
    }
}

impl From<ResolutionKind> for Dependency {
    fn from(value: ResolutionKind) -> Self {
        Self::Kind(value)
    }
}

impl From<ResolutionOption> for Dependency {
    fn from(value: ResolutionOption) -> Self {
        Self::Option(value)
    }
}

impl From<ResolutionMode> for Dependency {
    fn from(value: ResolutionMode) -> Self {
        Self::Mode(value)
    }
}

/// Positional access to a dependency list. A shape mismatch is a bug in
/// the check that declared the list.
pub trait DependencyList {
    fn string(&self, at: usize) -> Result<&str>;
    fn opt_string(&self, at: usize) -> Result<Option<&str>>;
    fn kind(&self, at: usize) -> Result<ResolutionKind>;
    fn option(&self, at: usize) -> Result<ResolutionOption>;
    fn mode(&self, at: usize) -> Result<ResolutionMode>;
}

fn mismatch(at: usize, expected: &str, found: Option<&Dependency>) -> Error {
    Error::invariant(format!("dependency {at}: expected {expected}, found {found:?}"))
}

impl DependencyList for [Dependency] {
    fn string(&self, at: usize) -> Result<&str> {
        match self.get(at) {
            Some(Dependency::Str(s)) => Ok(s),
            other => Err(mismatch(at, "string", other)),
        }
    }

    fn opt_string(&self, at: usize) -> Result<Option<&str>> {
        match self.get(at) {
            Some(Dependency::OptStr(s)) => Ok(s.as_deref()),
            Some(Dependency::Str(s)) => Ok(Some(s)),
            other => Err(mismatch(at, "optional string", other)),
        }
    }

    fn kind(&self, at: usize) -> Result<ResolutionKind> {
        match self.get(at) {
            Some(Dependency::Kind(k)) => Ok(*k),
            other => Err(mismatch(at, "resolution kind", other)),
        }
    }

    fn option(&self, at: usize) -> Result<ResolutionOption> {
        match self.get(at) {
            Some(Dependency::Option(o)) => Ok(*o),
            other => Err(mismatch(at, "resolution option", other)),
        }
    }

    fn mode(&self, at: usize) -> Result<ResolutionMode> {
        match self.get(at) {
            Some(Dependency::Mode(m)) => Ok(*m),
            other => Err(mismatch(at, "resolution mode", other)),
        }
    }
}
