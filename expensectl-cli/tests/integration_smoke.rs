//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

fn expensectl() -> Command {
    let mut cmd = Command::cargo_bin("expensectl").unwrap();
    cmd.env_remove("DATABASE_URL").env_remove("EXPENSECTL_BIND");
    cmd
}

#[test]
fn test_help_lists_commands() {
    expensectl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("apikey"));
}

#[test]
fn test_serve_help() {
    expensectl()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Allow permissive CORS"));
}

#[test]
fn test_apikey_create_help() {
    expensectl()
        .args(["apikey", "create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Label for the key"));
}

#[test]
fn test_user_add_help() {
    expensectl()
        .args(["user", "add", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--full-name"));
}

#[test]
fn test_completions_bash() {
    expensectl()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expensectl"));
}

#[test]
fn test_config_init_show_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path_arg = path.to_str().unwrap();

    expensectl()
        .args(["--config", path_arg, "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    expensectl()
        .args(["--config", path_arg, "config", "init"])
        .assert()
        .success();

    expensectl()
        .args(["--config", path_arg, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    expensectl()
        .args(["--config", path_arg, "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page_size = 25"));
}

#[test]
fn test_migrate_without_database_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    expensectl()
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .args(["--config", path.to_str().unwrap(), "migrate"])
        .assert()
        .failure();
}

#[test]
fn test_unknown_command_fails() {
    expensectl().arg("frobnicate").assert().failure();
}
