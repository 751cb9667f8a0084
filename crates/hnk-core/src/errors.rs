//! Error types for hnk-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Layer;

/// Domain-specific errors for HNK operations.
#[derive(Error, Debug)]
pub enum HnkError {
    /// The workspace has not been initialized with `hnk init`.
    #[error("Workspace not initialized. Run `hnk init`.")]
    NotInitialized,

    /// No descriptor catalog has been loaded into the workspace.
    #[error("No descriptor catalog loaded. Run `hnk load <dir>` first.")]
    CorpusNotLoaded,

    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidGlobalConfig(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// A path or file was not found.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// An invalid path was provided (e.g., disk root, system directory).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid argument provided to a command.
    #[error("{0}")]
    InvalidArgument(String),

    // =========================================================================
    // Narrowing Errors
    // =========================================================================
    /// A layer was scoped to a parent id that no longer exists in the catalog.
    ///
    /// Fatal to the current turn; the session must be reset or re-locked.
    #[error("Scope not found at {layer} layer: `{scope_id}` is not in the catalog. Reset the session with /clear or re-lock it.")]
    ScopeNotFound {
        /// The layer whose scope failed to resolve.
        layer: Layer,
        /// The missing parent id.
        scope_id: String,
    },

    /// The embedding provider failed after its single automatic retry.
    #[error("Embedding provider unavailable: {reason}")]
    EmbeddingUnavailable {
        /// Description of the failure.
        reason: String,
        /// Whether the caller may retry the turn later.
        retryable: bool,
    },

    /// A layer exhausted its clarification budget without resolving.
    ///
    /// Carries the deepest successfully resolved scope so the caller can
    /// offer manual selection instead of discarding progress.
    #[error("Clarification budget exhausted at {layer} layer after {attempts} attempts.")]
    ClarificationExhausted {
        /// The layer that could not be resolved.
        layer: Layer,
        /// Number of clarification attempts spent at that layer.
        attempts: u8,
        /// Project scope resolved before the failure, if any.
        project_ids: Option<Vec<String>>,
        /// Document resolved before the failure, if any.
        document_id: Option<String>,
    },

    /// A lock/unlock command is incompatible with the current session state.
    ///
    /// Recovered locally by the engine with a no-op response.
    #[error("Invalid lock state: {0}")]
    InvalidLockState(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// Session id contains characters that cannot form a safe filename.
    #[error("Invalid session id `{0}`: use only letters, digits, '.', '_' and '-'.")]
    InvalidSessionId(String),

    /// Session state I/O error.
    #[error("Session I/O error at `{path}`: {message}")]
    SessionIo {
        /// Path to the session file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// Session state parse error.
    #[error("Session parse error at `{path}`: {message}")]
    SessionParse {
        /// Path to the session file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Unknown inline session command.
    #[error("Unsupported command: /{0}. Known commands: /clear, /lock <project-id>, /unlock.")]
    UnknownCommand(String),

    // =========================================================================
    // Catalog Errors
    // =========================================================================
    /// Catalog I/O error.
    #[error("Catalog I/O error at `{path}`: {message}")]
    CatalogIo {
        /// Path to the catalog file or directory.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// Catalog parse error.
    #[error("Catalog parse error at `{path}`: {message}")]
    CatalogParse {
        /// Path to the catalog file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Catalog records violate uniqueness or referential constraints.
    #[error("Catalog integrity violation: {0}")]
    CatalogIntegrity(String),

    /// Catalog is incompatible with the active embedding backend.
    #[error("Catalog incompatible: {reason}. Re-run `hnk load` with the active embedding backend.")]
    CatalogIncompatible {
        /// Reason for incompatibility.
        reason: String,
    },

    /// Descriptor record failed validation during load.
    #[error("Invalid descriptor record `{id}`: {message}")]
    InvalidDescriptor {
        /// The offending record id.
        id: String,
        /// Description of the violation.
        message: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HnkError {
    /// Whether the failing turn may be retried without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUnavailable {
                retryable: true,
                ..
            }
        )
    }
}
