//! # CI Pipeline
//!
//! `cargo xtask ci` runs a fixed list of cargo invocations in order and stops at
//! the first one that fails, exiting with that step's status code.

use crate::handlers::testing::{doctest_args, has_nextest, test_args};
use anyhow::Context;
use std::process::Command;

/// Operating system family of the host running the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    /// The OS this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }

    /// Doc tests are not run on Windows hosts.
    #[must_use]
    pub const fn runs_doctests(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

/// One cargo invocation of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: &'static str,
    pub args: Vec<String>,
}

impl Step {
    fn new<I, S>(name: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name, args: args.into_iter().map(Into::into).collect() }
    }

    /// The command line as a user would type it.
    #[must_use]
    pub fn command_line(&self) -> String {
        format!("cargo {}", self.args.join(" "))
    }
}

/// The ordered steps for `os`.
#[must_use]
pub fn pipeline(os: HostOs, nextest: bool) -> Vec<Step> {
    let mut steps = vec![
        Step::new("fmt", ["fmt", "--all", "--", "--check"]),
        Step::new(
            "clippy",
            ["clippy", "--workspace", "--all-targets", "--all-features", "--", "-D", "warnings"],
        ),
        Step::new("test", test_args(None, nextest)),
    ];

    if os.runs_doctests() {
        steps.push(Step::new("doctest", doctest_args(None)));
    }

    steps
}

/// Executes a single step and reports its exit code.
pub trait StepRunner {
    /// Returns the exit code; `0` means success.
    ///
    /// # Errors
    /// Returns an error if the step could not be started.
    fn run(&mut self, step: &Step) -> anyhow::Result<i32>;
}

/// Spawns `cargo` for each step, inheriting stdio.
#[derive(Debug, Default)]
pub struct CargoRunner;

impl StepRunner for CargoRunner {
    fn run(&mut self, step: &Step) -> anyhow::Result<i32> {
        let status = Command::new("cargo")
            .args(&step.args)
            .status()
            .with_context(|| format!("Failed to execute '{}'", step.command_line()))?;

        // Killed by a signal.
        Ok(status.code().unwrap_or(1))
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiOutcome {
    Passed,
    Failed { step: &'static str, code: i32 },
}

impl CiOutcome {
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed { code, .. } => *code,
        }
    }
}

/// Runs `steps` in order; a non-zero exit code stops the pipeline.
///
/// # Errors
/// Returns an error if a step could not be started.
pub fn run_pipeline(steps: &[Step], runner: &mut impl StepRunner) -> anyhow::Result<CiOutcome> {
    for (index, step) in steps.iter().enumerate() {
        println!("▶️  [{}/{}] {}", index + 1, steps.len(), step.command_line());

        let code = runner.run(step)?;
        if code != 0 {
            println!("❌ Step '{}' failed with exit code {code}", step.name);
            return Ok(CiOutcome::Failed { step: step.name, code });
        }
    }

    println!("✅ All {} steps passed", steps.len());
    Ok(CiOutcome::Passed)
}

/// Entry point of `cargo xtask ci`.
///
/// # Errors
/// Returns an error if a step could not be started. A failing step terminates
/// the process with the step's exit code instead.
pub fn run_ci(dry_run: bool) -> anyhow::Result<()> {
    let os = HostOs::current();
    let steps = pipeline(os, has_nextest());

    if !os.runs_doctests() {
        println!("ℹ️  Doc tests are skipped on {os:?}");
    }

    if dry_run {
        for step in &steps {
            println!("{}", step.command_line());
        }
        return Ok(());
    }

    match run_pipeline(&steps, &mut CargoRunner)? {
        CiOutcome::Passed => Ok(()),
        outcome @ CiOutcome::Failed { .. } => std::process::exit(outcome.exit_code()),
    }
}
