//! Shared helpers for hnk CLI integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Write a test configuration using the deterministic hash backend.
///
/// The similarity floor is lowered to suit short fixture texts; hash
/// embedding cosines for brief descriptors sit well below real-model
/// similarities.
pub fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("hnk-config.yaml");
    fs::write(
        &path,
        r#"embedding:
  provider: hash
  dimension: 256
narrowing:
  project:
    minSim: 0.05
    decisiveGap: 0.08
    topK: 5
    pairMargin: 0.02
  document:
    minSim: 0.05
    decisiveGap: 0.08
    topK: 5
    pairMargin: 0.02
  section:
    minSim: 0.05
    decisiveGap: 0.05
    topK: 5
    pairMargin: 0.02
  maxAttemptsPerLayer: 2
"#,
    )
    .expect("write test config");
    path
}

/// Build an `hnk` command bound to a workspace and test config.
pub fn hnk_cmd(workspace: &Path, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hnk").expect("hnk binary");
    cmd.current_dir(workspace)
        .env("HNK_CONFIG", config)
        .env("HNK_COLOR", "never")
        .env_remove("HNK_VERBOSE");
    cmd
}

/// Write a two-project descriptor corpus with clearly separated vocabulary.
pub fn write_corpus(dir: &Path) -> PathBuf {
    let source = dir.join("descriptors");
    fs::create_dir_all(&source).expect("create descriptor dir");

    fs::write(
        source.join("projects.jsonl"),
        concat!(
            r#"{"projectId":"atlas","summary":"warehouse automation robotics rollout","themes":["logistics","robotics"],"docTypes":{"contract":2}}"#, "\n",
            r#"{"projectId":"borealis","summary":"solar farm construction financing","themes":["energy","finance"],"docTypes":{"report":3}}"#, "\n",
        ),
    )
    .expect("write projects");

    fs::write(
        source.join("documents.jsonl"),
        concat!(
            r#"{"documentId":"atlas-msa","projectId":"atlas","docType":"contract","summary":"master services agreement for warehouse automation","topics":["payment","termination"]}"#, "\n",
            r#"{"documentId":"borealis-fin","projectId":"borealis","docType":"report","summary":"solar farm financing model report","topics":["loans"]}"#, "\n",
        ),
    )
    .expect("write documents");

    fs::write(
        source.join("sections.jsonl"),
        concat!(
            r#"{"sectionId":"atlas-msa-s1","documentId":"atlas-msa","projectId":"atlas","title":"Termination clause","pages":{"start":12,"end":14},"excerpt":"Either party may terminate with 60 days notice."}"#, "\n",
            r#"{"sectionId":"borealis-fin-s1","documentId":"borealis-fin","projectId":"borealis","title":"Loan covenants","pages":{"start":3,"end":5},"excerpt":"The borrower shall maintain coverage ratios."}"#, "\n",
        ),
    )
    .expect("write sections");

    source
}

/// Write twin projects whose profiles coincide apart from the document-type
/// inventory, forcing a Project-layer clarification.
pub fn write_twin_corpus(dir: &Path) -> PathBuf {
    let source = dir.join("descriptors");
    fs::create_dir_all(&source).expect("create descriptor dir");

    fs::write(
        source.join("projects.jsonl"),
        concat!(
            r#"{"projectId":"fitout-east","summary":"city office renovation program","themes":["construction"],"docTypes":{"contract":4}}"#, "\n",
            r#"{"projectId":"fitout-west","summary":"city office renovation program","themes":["construction"],"docTypes":{"proposal":4}}"#, "\n",
        ),
    )
    .expect("write projects");

    fs::write(
        source.join("documents.jsonl"),
        concat!(
            r#"{"documentId":"east-main","projectId":"fitout-east","docType":"contract","summary":"construction contract terms and termination","topics":[]}"#, "\n",
            r#"{"documentId":"west-main","projectId":"fitout-west","docType":"proposal","summary":"design proposal scope and pricing","topics":[]}"#, "\n",
        ),
    )
    .expect("write documents");

    fs::write(
        source.join("sections.jsonl"),
        concat!(
            r#"{"sectionId":"east-main-s1","documentId":"east-main","projectId":"fitout-east","title":"Termination rules","pages":{"start":8,"end":9},"excerpt":"Termination requires written notice."}"#, "\n",
            r#"{"sectionId":"west-main-s1","documentId":"west-main","projectId":"fitout-west","title":"Pricing schedule","pages":{"start":2,"end":3},"excerpt":"Unit pricing by floor."}"#, "\n",
        ),
    )
    .expect("write sections");

    source
}

/// Initialize a workspace and load the standard two-project corpus.
pub fn setup_loaded_workspace(workspace: &Path, config: &Path) -> PathBuf {
    hnk_cmd(workspace, config).arg("init").assert().success();
    let source = write_corpus(workspace);
    hnk_cmd(workspace, config)
        .arg("load")
        .arg(&source)
        .arg("--corpus-version")
        .arg("v1")
        .assert()
        .success();
    source
}
