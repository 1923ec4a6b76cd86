#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod analysis;
pub mod checks;
pub mod config;
pub mod engine;
pub mod entrypoints;
pub mod error;
pub mod host;
pub mod kinds;
pub mod lexers;
pub mod matrix;
pub mod namespace;
pub mod package;
pub mod problem;
pub mod syntax;

pub use analysis::{check_package, check_package_with, Analysis, TypesTag};
pub use config::{CheckOptions, EntrypointFilter, HeuristicOptions};
pub use error::{Error, Result};
pub use engine::{Check, CheckContext, CheckEnv, Dependency, Engine};
pub use host::{Host, HostSet, ResolveOutcome};
pub use kinds::{
    DetectedReason, ModuleKind, ModuleKindRecord, Resolution, ResolutionKind, ResolutionMode,
    ResolutionOption,
};
pub use matrix::{Entrypoint, ResolutionCell};
pub use package::{Package, PackageFs, PackageJson};
pub use problem::{Problem, ProblemKind};
