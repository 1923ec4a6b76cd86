//! Check scheduling.
//!
//! The engine walks the matrix in a fixed order and asks each check what
//! its inputs are for the current cell. Checks run once per distinct
//! `(name, dependencies)` pair; later cells with the same inputs reuse the
//! recorded problems. Problems are stored once, by value.

mod dependency;

pub use dependency::{Dependency, DependencyList};

use crate::checks;
use crate::config::CheckOptions;
use crate::error::{Error, Result};
use crate::host::{Host, HostSet};
use crate::kinds::{ResolutionKind, ResolutionOption};
use crate::matrix::{Entrypoint, ResolutionCell};
use crate::package::Package;
use crate::problem::Problem;
use rustc_hash::FxHashMap;

/// The cell a check is asked about.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub subpath: &'a str,
    pub kind: ResolutionKind,
    pub cell: &'a ResolutionCell,
    /// For per-file checks, the file being visited.
    pub file: Option<&'a str>,
}

impl CheckContext<'_> {
    #[must_use]
    pub fn option(&self) -> ResolutionOption {
        self.kind.option()
    }

    #[must_use]
    pub fn types_file(&self) -> Option<&str> {
        self.cell.resolution.as_ref().map(|r| r.file_name.as_str())
    }

    #[must_use]
    pub fn implementation_file(&self) -> Option<&str> {
        self.cell
            .implementation_resolution
            .as_ref()
            .map(|r| r.file_name.as_str())
    }
}

/// Everything a check may read while executing.
#[derive(Debug, Clone, Copy)]
pub struct CheckEnv<'a> {
    pub hosts: &'a HostSet<'a>,
    pub options: &'a CheckOptions,
    pub entrypoints: &'a [Entrypoint],
}

impl<'a> CheckEnv<'a> {
    #[must_use]
    pub fn host(&self, option: ResolutionOption) -> &'a Host<'a> {
        self.hosts.get(option)
    }

    #[must_use]
    pub fn package(&self) -> &'a Package {
        self.hosts.package()
    }

    /// The matrix cell for `subpath` under `kind`.
    pub fn cell(&self, subpath: &str, kind: ResolutionKind) -> Result<&'a ResolutionCell> {
        self.entrypoints
            .iter()
            .find(|e| e.subpath == subpath)
            .and_then(|e| e.cell(kind))
            .ok_or_else(|| Error::invariant(format!("no matrix cell for {subpath} under {kind}")))
    }
}

/// One analysis run over the matrix.
pub trait Check {
    /// Stable name; part of the memo key.
    fn name(&self) -> &'static str;

    /// Visit every file of a cell rather than the cell itself.
    fn enumerate_files(&self) -> bool {
        false
    }

    /// The inputs `execute` depends on, or `None` when the check does not
    /// apply.
    fn dependencies(&self, cx: &CheckContext<'_>, env: &CheckEnv<'_>) -> Option<Vec<Dependency>>;

    fn execute(&self, deps: &[Dependency], env: &CheckEnv<'_>) -> Result<Vec<Problem>>;
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct MemoKey {
    check: &'static str,
    dependencies: Vec<Dependency>,
}

/// Runs a fixed list of checks over a matrix.
pub struct Engine<'c> {
    checks: Vec<Box<dyn Check + 'c>>,
}

impl Default for Engine<'_> {
    fn default() -> Self {
        Self::with_checks(checks::all())
    }
}

impl<'c> Engine<'c> {
    /// An engine with the standard checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_checks(checks: Vec<Box<dyn Check + 'c>>) -> Self {
        Self { checks }
    }

    /// Run every check over every cell. Fills each cell's visible problems
    /// and returns the flat problem list.
    pub fn run(
        &self,
        entrypoints: &mut [Entrypoint],
        hosts: &HostSet<'_>,
        options: &CheckOptions,
    ) -> Result<Vec<Problem>> {
        let mut run = Run::default();
        let visible = {
            let env = CheckEnv {
                hosts,
                options,
                entrypoints,
            };
            self.visit(&env, &mut run)?
        };

        for (entrypoint, cells) in entrypoints.iter_mut().zip(visible) {
            for (cell, indices) in entrypoint.resolutions.iter_mut().zip(cells) {
                cell.visible_problems = indices;
            }
        }
        tracing::debug!(
            problems = run.problems.len(),
            executions = run.memo.len(),
            "checks complete"
        );
        Ok(run.problems)
    }

    fn visit(&self, env: &CheckEnv<'_>, run: &mut Run) -> Result<Vec<Vec<Vec<usize>>>> {
        let mut visible = Vec::with_capacity(env.entrypoints.len());
        for entrypoint in env.entrypoints {
            let mut per_cell = Vec::with_capacity(entrypoint.resolutions.len());
            for cell in &entrypoint.resolutions {
                let mut indices = Vec::new();
                if cell.is_checked(entrypoint.is_wildcard) {
                    for check in &self.checks {
                        let base = CheckContext {
                            subpath: &entrypoint.subpath,
                            kind: cell.kind,
                            cell,
                            file: None,
                        };
                        if check.enumerate_files() {
                            let files = cell.files.iter().flatten().map(String::as_str);
                            let implementation = cell
                                .implementation_resolution
                                .iter()
                                .map(|r| r.file_name.as_str());
                            for file in files.chain(implementation) {
                                let cx = CheckContext {
                                    file: Some(file),
                                    ..base
                                };
                                run.check(check.as_ref(), &cx, env, &mut indices)?;
                            }
                        } else {
                            run.check(check.as_ref(), &base, env, &mut indices)?;
                        }
                    }
                }
                per_cell.push(indices);
            }
            visible.push(per_cell);
        }
        Ok(visible)
    }
}

impl std::fmt::Debug for Engine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|c| c.name()))
            .finish()
    }
}

#[derive(Default)]
struct Run {
    problems: Vec<Problem>,
    index: FxHashMap<Problem, usize>,
    memo: FxHashMap<MemoKey, Vec<usize>>,
}

impl Run {
    fn check(
        &mut self,
        check: &dyn Check,
        cx: &CheckContext<'_>,
        env: &CheckEnv<'_>,
        visible: &mut Vec<usize>,
    ) -> Result<()> {
        let Some(dependencies) = check.dependencies(cx, env) else {
            return Ok(());
        };
        let key = MemoKey {
            check: check.name(),
            dependencies,
        };
        let indices = if let Some(hit) = self.memo.get(&key) {
            tracing::debug!(check = key.check, subpath = cx.subpath, kind = %cx.kind, "memo hit");
            hit.clone()
        } else {
            let problems = check.execute(&key.dependencies, env)?;
            let indices: Vec<usize> = problems.into_iter().map(|p| self.intern(p)).collect();
            self.memo.insert(key, indices.clone());
            indices
        };
        for index in indices {
            if !visible.contains(&index) {
                visible.push(index);
            }
        }
        Ok(())
    }

    fn intern(&mut self, problem: Problem) -> usize {
        if let Some(&index) = self.index.get(&problem) {
            return index;
        }
        let index = self.problems.len();
        self.problems.push(problem.clone());
        self.index.insert(problem, index);
        index
    }
}
