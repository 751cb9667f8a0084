//! Shared constants for HNK directory and file layout.

/// Global configuration directory name under the user's home (`~/.hnk`).
pub const HNK_HOME_DIR: &str = ".hnk";

/// Global configuration filename.
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

/// Workspace marker directory at the corpus root.
pub const WORKSPACE_DIR: &str = ".hnk";

/// Catalog directory inside the workspace dir.
pub const CORPUS_DIR: &str = "corpus";

/// Session state directory inside the workspace dir.
pub const SESSIONS_DIR: &str = "sessions";

/// Suffix for the per-session turn log.
pub const TURN_LOG_SUFFIX: &str = ".turns.jsonl";

/// Ingestion input filenames consumed by `load` (finished descriptor records).
pub const INGEST_PROJECTS_FILENAME: &str = "projects.jsonl";
pub const INGEST_DOCUMENTS_FILENAME: &str = "documents.jsonl";
pub const INGEST_SECTIONS_FILENAME: &str = "sections.jsonl";
