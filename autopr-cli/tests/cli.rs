use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

fn auto_pr(workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_auto-pr"));
    cmd.arg("-w")
        .arg(workdir)
        .env_remove("APR_WORKDIR")
        .env_remove("APR_API_KEY")
        .env_remove("APR_DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

fn init(workdir: &Path) {
    auto_pr(workdir)
        .args(["init", "--api-key", "secret", "--ssh-key-file", "/tmp/id_test"])
        .assert()
        .success();
}

fn record(name: &str, done: bool) -> Value {
    json!({
        "owner": "acme",
        "name": name,
        "ssh_url": format!("git@github.com:acme/{name}.git"),
        "default_branch": "main",
        "existing_pr": null,
        "removed": false,
        "done": done,
    })
}

fn write_db(workdir: &Path, repositories: Vec<Value>) {
    let db = json!({
        "account": { "name": "Joe", "email": "joe@example.com" },
        "repositories": repositories,
    });
    std::fs::write(
        workdir.join("db.json"),
        serde_json::to_string_pretty(&db).unwrap(),
    )
    .unwrap();
}

fn read_db(workdir: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(workdir.join("db.json")).unwrap()).unwrap()
}

fn done_flags(workdir: &Path) -> Vec<bool> {
    read_db(workdir)["repositories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["done"].as_bool().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_work_directory_files() {
    let dir = TempDir::new().unwrap();
    init(dir.path());

    assert!(dir.path().join("repos").is_dir());
    let config = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(config.contains("api_key: secret"), "{config}");
    assert!(config.contains("/tmp/id_test"), "{config}");
    assert_eq!(read_db(dir.path())["repositories"], json!([]));
}

#[test]
fn init_twice_keeps_files_and_warns() {
    let dir = TempDir::new().unwrap();
    init(dir.path());

    auto_pr(dir.path())
        .args(["init", "--api-key", "other"])
        .assert()
        .success()
        .stderr(contains("config file exists - not overriding"))
        .stderr(contains("database file exists - not overriding"));

    let config = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(config.contains("api_key: secret"), "{config}");
}

#[test]
fn init_api_key_from_environment() {
    let dir = TempDir::new().unwrap();
    auto_pr(dir.path())
        .env("APR_API_KEY", "from-env")
        .args(["init", "--ssh-key-file", "/tmp/id_test"])
        .assert()
        .success();

    let config = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(config.contains("api_key: from-env"), "{config}");
}

#[test]
fn init_rejects_missing_custom_repos_dir() {
    let dir = TempDir::new().unwrap();
    auto_pr(dir.path())
        .arg("--repos-dir")
        .arg(dir.path().join("nowhere"))
        .args(["init", "--api-key", "secret", "--ssh-key-file", "/tmp/id_test"])
        .assert()
        .failure()
        .stderr(contains("does not exist"));
    assert!(!dir.path().join("config.yaml").exists());
}

#[test]
fn init_records_existing_custom_repos_dir() {
    let dir = TempDir::new().unwrap();
    let repos = TempDir::new().unwrap();
    auto_pr(dir.path())
        .arg("--repos-dir")
        .arg(repos.path())
        .args(["init", "--api-key", "secret", "--ssh-key-file", "/tmp/id_test"])
        .assert()
        .success();

    let config = std::fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(config.contains("custom_repos_dir"), "{config}");
    assert!(!dir.path().join("repos").exists());
}

// ---------------------------------------------------------------------------
// test / run preconditions
// ---------------------------------------------------------------------------

#[test]
fn run_and_test_require_pull_first() {
    let dir = TempDir::new().unwrap();
    init(dir.path());

    for command in ["run", "test"] {
        auto_pr(dir.path())
            .arg(command)
            .assert()
            .failure()
            .stderr(contains("No data found. Please run 'pull' first."));
    }
}

#[test]
fn run_requires_update_command() {
    let dir = TempDir::new().unwrap();
    init(dir.path());
    write_db(dir.path(), vec![record("a", false)]);

    auto_pr(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(contains("No update command found"));
    assert_eq!(done_flags(dir.path()), vec![false]);
}

#[test]
fn commands_fail_without_init() {
    let dir = TempDir::new().unwrap();
    auto_pr(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("auto-pr init"));
}

// ---------------------------------------------------------------------------
// reset
// ---------------------------------------------------------------------------

#[test]
fn reset_all_clears_done_flags() {
    let dir = TempDir::new().unwrap();
    init(dir.path());
    write_db(dir.path(), vec![record("a", true), record("b", true)]);

    auto_pr(dir.path())
        .args(["reset", "all"])
        .assert()
        .success()
        .stdout(contains("Reset 2 repositories"));
    assert_eq!(done_flags(dir.path()), vec![false, false]);
}

#[test]
fn debug_logging_stays_off_stdout() {
    let dir = TempDir::new().unwrap();
    init(dir.path());
    write_db(dir.path(), vec![record("a", true)]);

    auto_pr(dir.path())
        .env("RUST_LOG", "trace")
        .args(["--debug", "reset", "all"])
        .assert()
        .success()
        .stdout("✓ Reset 1 repositories\n");
}

#[test]
fn reset_repos_reports_unknown_names() {
    let dir = TempDir::new().unwrap();
    init(dir.path());
    write_db(dir.path(), vec![record("a", true), record("b", true)]);

    auto_pr(dir.path())
        .args(["reset", "repos", "acme/a", "acme/missing"])
        .assert()
        .success()
        .stderr(contains("acme/missing"));
    assert_eq!(done_flags(dir.path()), vec![false, true]);
}

#[test]
fn reset_repos_rejects_malformed_names() {
    let dir = TempDir::new().unwrap();
    init(dir.path());

    auto_pr(dir.path())
        .args(["reset", "repos", "not-a-repo"])
        .assert()
        .failure()
        .stderr(contains("expected OWNER/NAME"));
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

#[test]
fn status_json_lists_repositories_without_pull_requests() {
    let dir = TempDir::new().unwrap();
    init(dir.path());
    write_db(dir.path(), vec![record("a", false)]);

    let output = auto_pr(dir.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["missing"], json!(["acme/a"]));
    assert_eq!(report["summary"]["open"], json!(0));
}

#[test]
fn status_table_on_empty_database() {
    let dir = TempDir::new().unwrap();
    init(dir.path());

    auto_pr(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No pull requests tracked."));
}
