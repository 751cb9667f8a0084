//! Inline session command handling: /lock, /unlock, /clear, and scoping.

mod common;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{hnk_cmd, setup_loaded_workspace, write_config};

#[test]
fn lock_acknowledges_and_persists() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/lock atlas")
        .assert()
        .success()
        .stdout(predicate::str::contains("locked to project `atlas`"));

    hnk_cmd(temp.path(), &config)
        .arg("session")
        .arg("show")
        .arg("s1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project lock: atlas"));
}

#[test]
fn lock_unknown_project_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/lock ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Scope not found"));
}

#[test]
fn locked_session_never_answers_from_other_project() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/lock atlas")
        .assert()
        .success();

    // The query matches borealis vocabulary, but the lock confines the
    // search to atlas; the reply must never surface borealis content.
    let output = hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("--json")
        .arg("solar farm financing loan covenants")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(
        !stdout.contains("borealis"),
        "locked session leaked cross-project content: {}",
        stdout
    );
}

#[test]
fn unlock_without_lock_is_noop() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/unlock")
        .assert()
        .success()
        .stdout(predicate::str::contains("No lock to release."));
}

#[test]
fn unlock_releases_previous_lock() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/lock atlas")
        .assert()
        .success();

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/unlock")
        .assert()
        .success()
        .stdout(predicate::str::contains("Locks released."));

    hnk_cmd(temp.path(), &config)
        .arg("session")
        .arg("show")
        .arg("s1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Project lock: (none)"));
}

#[test]
fn clear_destroys_session_state() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/lock atlas")
        .assert()
        .success();

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session cleared."));

    hnk_cmd(temp.path(), &config)
        .arg("session")
        .arg("show")
        .arg("s1")
        .assert()
        .success()
        .stdout(predicate::str::contains("No session `s1`"));
}

#[test]
fn unknown_command_lists_known_ones() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("/frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported command"))
        .stderr(predicate::str::contains("/clear"));
}

#[test]
fn session_list_shows_locked_sessions() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("support-7")
        .arg("/lock atlas")
        .assert()
        .success();

    hnk_cmd(temp.path(), &config)
        .arg("session")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("support-7"))
        .stdout(predicate::str::contains("atlas"));
}
