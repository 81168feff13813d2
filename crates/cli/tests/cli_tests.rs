//! CLI smoke tests.
//!
//! These exercise the one-shot commands against a temporary data
//! directory. Pipeline commands that keep a child process in the
//! foreground are covered by the core integration tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deploykit(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deploykit").expect("binary should build");
    cmd.arg("--data-dir").arg(data_dir.path().join("data"));
    cmd
}

#[test]
fn test_status_on_fresh_data_dir() {
    let dir = TempDir::new().expect("temp dir");

    deploykit(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"))
        .stdout(predicate::str::contains("npm run start"));
}

#[test]
fn test_status_json_output() {
    let dir = TempDir::new().expect("temp dir");

    deploykit(&dir)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\": false"))
        .stdout(predicate::str::contains("\"persistentFoldersUI\""));
}

#[test]
fn test_deployments_on_fresh_data_dir() {
    let dir = TempDir::new().expect("temp dir");

    deploykit(&dir)
        .arg("deployments")
        .assert()
        .success()
        .stdout(predicate::str::contains("No deployments yet."));
}

#[test]
fn test_deploy_rejects_tiny_file() {
    let dir = TempDir::new().expect("temp dir");
    let bundle = dir.path().join("tiny.zip");
    std::fs::write(&bundle, b"PK").expect("setup");

    deploykit(&dir)
        .arg("deploy")
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too small"));
}

#[test]
fn test_deploy_rejects_non_zip_file() {
    let dir = TempDir::new().expect("temp dir");
    let bundle = dir.path().join("bogus.zip");
    std::fs::write(&bundle, [0u8; 64]).expect("setup");

    deploykit(&dir)
        .arg("deploy")
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid zip"));
}

#[test]
fn test_rollback_to_unknown_version_fails() {
    let dir = TempDir::new().expect("temp dir");

    deploykit(&dir)
        .args(["rollback", "2030-01-01T00-00-00-000Z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_update_is_visible_in_status() {
    let dir = TempDir::new().expect("temp dir");

    deploykit(&dir)
        .args(["config", "--command", "node server.js"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node server.js"));

    deploykit(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("node server.js"));
}

#[test]
fn test_config_rejects_traversal_in_persistent_folders() {
    let dir = TempDir::new().expect("temp dir");

    deploykit(&dir)
        .args(["config", "--persistent-folders", "uploads,../etc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid folder path"));
}

#[test]
fn test_envs_round_trip() {
    let dir = TempDir::new().expect("temp dir");
    let env_file = dir.path().join("prod.env");
    std::fs::write(&env_file, "PORT=8080\n").expect("setup");

    deploykit(&dir)
        .args(["envs", "set", "production"])
        .arg(&env_file)
        .assert()
        .success();

    deploykit(&dir)
        .args(["envs", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("production"));

    deploykit(&dir)
        .args(["envs", "show", "production"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORT=8080"));

    deploykit(&dir)
        .args(["envs", "delete", "production"])
        .assert()
        .success();

    deploykit(&dir)
        .args(["envs", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No environment files yet."));
}

#[test]
fn test_envs_rejects_invalid_name() {
    let dir = TempDir::new().expect("temp dir");
    let env_file = dir.path().join("x.env");
    std::fs::write(&env_file, "X=1\n").expect("setup");

    deploykit(&dir)
        .args(["envs", "set", "../evil"])
        .arg(&env_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid environment name"));
}
