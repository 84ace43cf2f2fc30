use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn moraine() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_moraine"));
    cmd.env_remove("MORAINE_USE_MULTIPROCESSING").env_remove("MORAINE__BORDER");
    cmd
}

fn params_file(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("run.cfg");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn without_arguments_prints_help_and_fails() {
    moraine().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn defaults_are_printed_verbatim() {
    moraine()
        .args(["params", "defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rgi_version = 61"))
        .stdout(predicate::str::contains("border = 20"));
}

#[test]
fn get_honours_file_and_environment() {
    let tmp = TempDir::new().unwrap();
    let file = params_file(tmp.path(), "border = 40\n");

    moraine().args(["params", "get", "border"]).assert().success().stdout("20\n");

    moraine()
        .args(["--params"])
        .arg(&file)
        .args(["params", "get", "border"])
        .assert()
        .success()
        .stdout("40\n");

    moraine()
        .env("MORAINE__BORDER", "80")
        .arg("--params")
        .arg(&file)
        .args(["params", "get", "border"])
        .assert()
        .success()
        .stdout("80\n");
}

#[test]
fn unknown_key_fails() {
    moraine()
        .args(["params", "get", "no_such_key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown parameter 'no_such_key'"));
}

#[test]
fn check_reports_type_errors_with_location() {
    let tmp = TempDir::new().unwrap();
    let file = params_file(tmp.path(), "# site\nborder = wide\n");

    moraine()
        .args(["params", "check"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parameter 'border' expects int, found 'wide'"))
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn check_strict_rejects_unknown_keys() {
    let tmp = TempDir::new().unwrap();
    let file = params_file(tmp.path(), "my_flag = True\n");

    moraine().args(["params", "check"]).arg(&file).assert().success().stdout(
        predicate::str::contains("'my_flag' is not a known parameter")
            .and(predicate::str::contains("parameters OK")),
    );

    moraine()
        .args(["params", "check", "--strict"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown parameter 'my_flag'"));
}

#[test]
fn dump_json_is_an_object() {
    moraine()
        .args(["params", "dump", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"))
        .stdout(predicate::str::contains("\"border\": 20"));
}

#[test]
fn diff_lists_changed_keys_only() {
    let tmp = TempDir::new().unwrap();
    let file = params_file(tmp.path(), "border = 80\nrgi_version = 61\n");

    moraine()
        .args(["params", "diff"])
        .arg(&file)
        .assert()
        .success()
        .stdout("border: 20 -> 80\n");
}

#[test]
fn glacier_directories_and_task_logs() {
    let tmp = TempDir::new().unwrap();
    let working_dir = tmp.path().join("wd");
    let file = params_file(tmp.path(), &format!("working_dir = {}\n", working_dir.display()));

    moraine()
        .arg("--params")
        .arg(&file)
        .args(["gdir", "init", "RGI60-11.00897", "RGI60-11.00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RGI60-11/RGI60-11.00/RGI60-11.00897"));

    let gdir = working_dir.join("per_glacier/RGI60-11/RGI60-11.00/RGI60-11.00897");
    fs::write(gdir.join("log.txt"), "2024-05-01T10:00:00;glacier_masks;SUCCESS\n").unwrap();

    moraine()
        .arg("--params")
        .arg(&file)
        .args(["tasks", "status", "glacier_masks"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"RGI60-11\.00001\s+-").unwrap())
        .stdout(predicate::str::is_match(r"RGI60-11\.00897\s+SUCCESS").unwrap());

    moraine()
        .arg("--params")
        .arg(&file)
        .args(["tasks", "compile-log", "glacier_masks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task log of 2 glaciers"));

    let csv = fs::read_to_string(working_dir.join("task_log.csv")).unwrap();
    assert_eq!(csv, "rgi_id,glacier_masks\nRGI60-11.00001,\nRGI60-11.00897,SUCCESS\n");
}

#[test]
fn gdir_init_rejects_bad_ids() {
    let tmp = TempDir::new().unwrap();
    let file = params_file(tmp.path(), &format!("working_dir = {}\n", tmp.path().display()));

    moraine()
        .arg("--params")
        .arg(&file)
        .args(["gdir", "init", "RGI60-11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed RGI id"));
}

#[test]
fn log_dir_receives_a_log_file() {
    let tmp = TempDir::new().unwrap();
    let logs = tmp.path().join("logs");

    moraine()
        .args(["--log-level", "DEBUG", "--log-dir"])
        .arg(&logs)
        .args(["params", "get", "border"])
        .assert()
        .success()
        .stdout("20\n");

    let files: Vec<_> = fs::read_dir(&logs).unwrap().map(|entry| entry.unwrap().path()).collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].file_name().unwrap().to_str().unwrap().starts_with("moraine"));
}
