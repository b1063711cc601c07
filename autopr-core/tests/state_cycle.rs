//! Discovery → selection → merge → checkpoint cycles against a real work directory.

use assert_fs::prelude::*;
use autopr_core::{
    filter, reconcile, state, workdir, Account, Credentials, Discovery, FilterRule,
    PersistedState, RepositoryId, RepositoryInfo, StateError, WorkDir,
};
use predicates::prelude::predicate;
use std::path::PathBuf;

fn info(owner: &str, name: &str, archived: bool) -> RepositoryInfo {
    RepositoryInfo {
        owner: owner.to_string(),
        name: name.to_string(),
        ssh_url: format!("git@github.com:{owner}/{name}.git"),
        default_branch: "main".to_string(),
        public: true,
        archived,
    }
}

fn account() -> Account {
    Account {
        name: "Joe Schmoe".to_string(),
        email: "joe@example.com".to_string(),
    }
}

fn pull(wd: &WorkDir, candidates: &[RepositoryInfo], rules: &[FilterRule]) -> PersistedState {
    let current = wd.load_state().expect("load");
    let discovery = Discovery {
        account: account(),
        repositories: filter::select(candidates, rules).expect("select"),
    };
    let merged = reconcile::merge(current, discovery);
    wd.save_state(&merged).expect("save");
    merged
}

// ---------------------------------------------------------------------------
// 1. Pull cycles
// ---------------------------------------------------------------------------

#[test]
fn repeated_pulls_keep_progress() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let wd = WorkDir::new(home.path(), None);
    let candidates = vec![info("acme", "x", false), info("acme", "y", false), info("acme", "old", true)];
    let rules = [FilterRule::add().match_owner("acme"), FilterRule::remove().archived(true)];

    let first = pull(&wd, &candidates, &rules);
    assert!(!first.needs_pulling());
    assert_eq!(first.pending_ids().len(), 2);

    let mut progressed = first.clone();
    let x = progressed.find_mut(&RepositoryId::new("acme", "x")).expect("x");
    x.done = true;
    x.existing_pr = Some(5);
    wd.save_state(&progressed).expect("checkpoint");

    let second = pull(&wd, &candidates, &rules);
    assert_eq!(second, progressed);
    assert_eq!(second.pending_ids(), vec![RepositoryId::new("acme", "y")]);
}

#[test]
fn narrowing_the_filter_marks_records_removed() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let wd = WorkDir::new(home.path(), None);
    let candidates = vec![info("acme", "x", false), info("acme", "y", false)];

    pull(&wd, &candidates, &[FilterRule::add().match_owner("^acme$")]);
    let narrowed = pull(
        &wd,
        &candidates,
        &[FilterRule::add().match_owner("^acme$"), FilterRule::remove().match_name(["^y$"])],
    );

    let y = narrowed.find(&RepositoryId::new("acme", "y")).expect("y kept");
    assert!(y.removed);
    assert_eq!(narrowed.pending_ids(), vec![RepositoryId::new("acme", "x")]);
}

#[test]
fn reset_after_a_finished_cycle() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let wd = WorkDir::new(home.path(), None);
    let mut s = pull(&wd, &[info("acme", "x", false), info("acme", "y", false)], &[]);
    for r in &mut s.repositories {
        r.done = true;
    }
    assert!(s.pending_ids().is_empty());

    s.reset_all();
    wd.save_state(&s).expect("save");
    assert_eq!(wd.load_state().expect("load").pending_ids().len(), 2);
}

// ---------------------------------------------------------------------------
// 2. State file
// ---------------------------------------------------------------------------

#[test]
fn state_file_is_pretty_json() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let wd = WorkDir::new(home.path(), None);
    pull(&wd, &[info("acme", "x", false)], &[]);

    home.child("db.json").assert(predicate::path::exists());
    home.child("db.json")
        .assert(predicate::str::contains("\"ssh_url\": \"git@github.com:acme/x.git\""));
    home.child("db.json.tmp").assert(predicate::path::missing());
}

#[test]
fn corrupt_state_reports_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child("db.json").write_str("{ not json").expect("write");

    let err = state::load_at(&home.path().join("db.json")).unwrap_err();
    assert!(matches!(err, StateError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("db.json"));
}

#[test]
fn duplicate_records_on_disk_are_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let record = r#"{"owner":"acme","name":"x","ssh_url":"u","default_branch":"main"}"#;
    home.child("db.json")
        .write_str(&format!(r#"{{"account":null,"repositories":[{record},{record}]}}"#))
        .expect("write");

    let err = state::load_at(&home.path().join("db.json")).unwrap_err();
    assert!(matches!(err, StateError::DuplicateRepository { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_then_pull() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let wd = WorkDir::new(home.path(), None);
    workdir::init(
        &wd,
        Credentials {
            api_key: "k".to_string(),
            ssh_key_file: PathBuf::from("/id"),
        },
    )
    .expect("init");

    home.child("config.yaml").assert(predicate::str::contains("api_key: k"));
    home.child("config.yaml").assert(predicate::str::contains("branch: autopr"));
    home.child("repos").assert(predicate::path::is_dir());

    let pulled = pull(&wd, &[info("acme", "x", false)], &wd.load_config().expect("config").repositories);
    assert_eq!(pulled.repositories.len(), 1);
}
