use crate::services::utils::normalize_project_name;
use anyhow::{Context, bail};

/// Runs a project with `cargo run`.
///
/// # Errors
/// Returns an error if the project fails to build or exits with a non-zero status.
pub fn run_project(project: &str) -> anyhow::Result<()> {
    let project = normalize_project_name(project);
    println!("🚀 Starting {project}...");

    let status = std::process::Command::new("cargo")
        .args(["run", "-p", &project])
        .status()
        .context("Failed to execute cargo run")?;

    if !status.success() {
        bail!("Project exited with non-zero status: {}", status.code().unwrap_or(-1));
    }

    Ok(())
}
