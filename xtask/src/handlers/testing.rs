use crate::services::utils::normalize_project_name;

/// Reports whether `cargo-nextest` is installed.
#[must_use]
pub fn has_nextest() -> bool {
    std::process::Command::new("cargo-nextest").arg("--version").output().is_ok()
}

fn is_workspace(project: Option<&str>) -> bool {
    project.is_none_or(|value| value == "all")
}

/// Cargo arguments running the tests of the workspace or of one crate.
#[must_use]
pub fn test_args(project: Option<&str>, nextest: bool) -> Vec<String> {
    let mut args: Vec<String> = if nextest {
        vec!["nextest".into(), "run".into()]
    } else {
        vec!["test".into()]
    };

    match project {
        Some(project) if !is_workspace(Some(project)) => {
            args.push("-p".into());
            args.push(normalize_project_name(project));
        },
        _ => args.push("--workspace".into()),
    }

    args.push("--all-features".into());

    if nextest {
        args.extend(
            [
                "--failure-output",
                "immediate-final",
                "--success-output",
                "never",
                "--status-level",
                "skip",
            ]
            .into_iter()
            .map(String::from),
        );
    } else {
        args.extend(["--tests", "--lib", "--bins", "--", "-q"].into_iter().map(String::from));
    }

    args
}

/// Cargo arguments running the doc tests of the workspace or of one crate.
#[must_use]
pub fn doctest_args(project: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = vec!["test".into(), "--doc".into()];

    match project {
        Some(project) if !is_workspace(Some(project)) => {
            args.push("-p".into());
            args.push(normalize_project_name(project));
        },
        _ => args.push("--workspace".into()),
    }

    args.push("--all-features".into());
    args
}

/// Runs tests in the workspace or a specific crate.
///
/// # Result
/// Returns an `anyhow::Result<()>` indicating success or failure of the test run.
///
/// # Errors
/// Returns an error if the test execution fails or if the test runner is not found.
pub fn run_tests(project: Option<&str>) -> anyhow::Result<()> {
    let target_label = if is_workspace(project) { "workspace" } else { "crate" };

    println!("🧪 Running {target_label} tests...");
    let nextest = has_nextest();

    println!("🧪 Running tests via '{}'...", if nextest { "nextest" } else { "cargo test" });
    let status = std::process::Command::new("cargo").args(test_args(project, nextest)).status()?;

    if !status.success() {
        anyhow::bail!("Tests failed!");
    }
    Ok(())
}

/// Runs doc tests in the workspace or a specific crate.
///
/// # Errors
/// Returns an error if the doctest execution fails.
pub fn run_doctests(project: Option<&str>) -> anyhow::Result<()> {
    let target_label = if is_workspace(project) { "workspace" } else { "crate" };

    println!("📚 Running {target_label} doc tests via 'cargo test --doc'...");
    let status = std::process::Command::new("cargo").args(doctest_args(project)).status()?;

    if !status.success() {
        anyhow::bail!("Doc tests failed!");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_the_default_target() {
        let args = test_args(None, false);
        assert_eq!(args[..3], ["test", "--workspace", "--all-features"]);
        assert_eq!(test_args(Some("all"), false), args);
    }

    #[test]
    fn single_crate_names_are_prefixed() {
        let args = test_args(Some("workflow"), true);
        assert_eq!(args[..4], ["nextest", "run", "-p", "moraine-workflow"]);
        assert!(args.contains(&"--failure-output".to_owned()));

        let args = doctest_args(Some("kernel"));
        assert_eq!(args, ["test", "--doc", "-p", "moraine-kernel", "--all-features"]);
    }
}
