//! End-to-end CLI flow: init -> load -> status -> ask.
//!
//! # Test Strategy
//!
//! - **Deterministic**: the hash embedding backend makes ranked candidates
//!   and decisions reproducible across runs
//! - **Shape-focused** for `--json` outputs: verify structure and field
//!   presence, not exact similarity values

mod common;

use predicates::prelude::*;
use tempfile::TempDir;

use common::{hnk_cmd, setup_loaded_workspace, write_config, write_corpus};

#[test]
fn init_creates_workspace_and_hints_next_steps() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    hnk_cmd(temp.path(), &config)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ok] Initialized HNK workspace"))
        .stdout(predicate::str::contains("hnk load"));

    // Second init is informational, not an error.
    hnk_cmd(temp.path(), &config)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn load_requires_initialized_workspace() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let source = write_corpus(temp.path());

    hnk_cmd(temp.path(), &config)
        .arg("load")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"))
        .stderr(predicate::str::contains("hnk init"));
}

#[test]
fn load_reports_record_counts() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    hnk_cmd(temp.path(), &config).arg("init").assert().success();
    let source = write_corpus(temp.path());

    hnk_cmd(temp.path(), &config)
        .arg("load")
        .arg(&source)
        .arg("--corpus-version")
        .arg("v1")
        .assert()
        .success()
        .stdout(predicate::str::contains("version v1"))
        .stdout(predicate::str::contains("2 projects, 2 documents, 2 sections"));
}

#[test]
fn load_json_report_shape() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    hnk_cmd(temp.path(), &config).arg("init").assert().success();
    let source = write_corpus(temp.path());

    let output = hnk_cmd(temp.path(), &config)
        .arg("load")
        .arg(&source)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let report: serde_json::Value =
        serde_json::from_str(&stdout).expect("load --json should return valid JSON");
    assert!(report.get("corpusVersion").is_some());
    assert_eq!(report["projects"], 2);
    assert_eq!(report["documents"], 2);
    assert_eq!(report["sections"], 2);
    assert_eq!(report["embedded"], 6);
}

#[test]
fn ask_resolves_distinct_query_to_section() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("termination clause warehouse automation robotics rollout master services agreement either party may terminate with 60 days notice")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ok] Resolved to section atlas-msa-s1"))
        .stdout(predicate::str::contains("pp. 12-14"))
        .stdout(predicate::str::contains("Project: atlas"))
        .stdout(predicate::str::contains("Document: atlas-msa"));
}

#[test]
fn ask_json_outcome_shape() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    let output = hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("--session")
        .arg("s1")
        .arg("--json")
        .arg("termination clause warehouse automation robotics rollout master services agreement")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let reply: serde_json::Value =
        serde_json::from_str(&stdout).expect("ask --json should return valid JSON");

    // camelCase contract fields
    assert_eq!(reply["sessionId"], "s1");
    assert!(reply.get("turnId").is_some());
    let outcome = &reply["outcome"];
    assert_eq!(outcome["kind"], "final");
    assert_eq!(outcome["projectId"], "atlas");
    assert_eq!(outcome["documentId"], "atlas-msa");
    assert_eq!(outcome["sectionId"], "atlas-msa-s1");
    assert_eq!(outcome["pageStart"], 12);
    assert_eq!(outcome["pageEnd"], 14);
    assert!(outcome.get("excerpt").is_some());
}

#[test]
fn ask_without_catalog_fails_with_hint() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    hnk_cmd(temp.path(), &config).arg("init").assert().success();

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("anything at all")
        .assert()
        .failure()
        .stderr(predicate::str::contains("hnk load"));
}

#[test]
fn ask_rejects_empty_message() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("ask")
        .arg("   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message cannot be empty"));
}

#[test]
fn status_shows_catalog_and_sessions() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    hnk_cmd(temp.path(), &config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("STATUS"))
        .stdout(predicate::str::contains("Initialized: yes"))
        .stdout(predicate::str::contains("version v1"))
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("Sessions: 0"));
}

#[test]
fn status_json_shape() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    let output = hnk_cmd(temp.path(), &config)
        .arg("status")
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let status: serde_json::Value =
        serde_json::from_str(&stdout).expect("status --json should return valid JSON");
    assert_eq!(status["initialized"], true);
    assert_eq!(status["catalog"]["projectCount"], 2);
    assert_eq!(status["catalog"]["corpusVersion"], "v1");
    assert!(status["sessions"].as_array().unwrap().is_empty());
}

#[test]
fn determinism_same_query_same_json_outcome() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    setup_loaded_workspace(temp.path(), &config);

    let query = "termination clause warehouse automation robotics rollout master services agreement";
    let mut outcomes = Vec::new();
    for session in ["a", "b"] {
        let output = hnk_cmd(temp.path(), &config)
            .arg("ask")
            .arg("--session")
            .arg(session)
            .arg("--json")
            .arg(query)
            .assert()
            .success();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout);
        let reply: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        outcomes.push(reply["outcome"].clone());
    }
    assert_eq!(outcomes[0], outcomes[1]);
}
