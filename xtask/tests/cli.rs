use assert_cmd::Command;
use predicates::prelude::*;

fn xtask() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xtask"))
}

#[test]
fn help_lists_the_ci_command() {
    xtask().arg("--help").assert().success().stdout(predicate::str::contains("ci"));
}

#[test]
fn ci_dry_run_prints_steps_in_order() {
    let output = xtask().args(["ci", "--dry-run"]).assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();

    let fmt = stdout.find("cargo fmt --all -- --check").unwrap();
    let clippy = stdout.find("cargo clippy").unwrap();
    assert!(fmt < clippy);
    assert_eq!(stdout.contains("--doc"), !cfg!(windows));
}

#[test]
fn unknown_subcommand_fails() {
    xtask().arg("setup").assert().failure();
}
