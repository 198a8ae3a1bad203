//! Binary-level tests for everything that happens before the container
//! engine is contacted.

use assert_cmd::Command;
use predicates::prelude::*;

fn testbox(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("testbox").unwrap();
    cmd.current_dir(dir).env("HOME", dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn version_prints_program_and_version() {
    let dir = tempfile::tempdir().unwrap();
    testbox(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("testbox -- v1.0.0"));
}

#[test]
fn help_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    testbox(dir.path())
        .arg("h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: testbox [OPTION | COMMAND]"))
        .stdout(predicate::str::contains("testbox golangci-lint run"));
}

#[test]
fn no_command_prints_hint() {
    let dir = tempfile::tempdir().unwrap();
    testbox(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "please enter the test command, such as `testbox go test ./...`",
        ));
}

#[test]
fn outside_a_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    testbox(dir.path())
        .args(["go", "test", "./..."])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("need to execute commands inside a project"));
}

#[test]
fn version_gate_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("testbox.yaml"), "MinVersionNumber: 999\n").unwrap();
    testbox(dir.path())
        .arg("go test ./...")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("the tool version is too low"));
}

#[test]
fn broken_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".testbox.yaml"), "Image: [golang\n").unwrap();
    testbox(dir.path())
        .args(["go", "vet"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed to parse"))
        .stdout(predicate::str::contains(".testbox.yaml"));
}

#[test]
fn unbalanced_quotes_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    testbox(dir.path())
        .arg("go test -run 'Pool")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("invalid command"));
}
