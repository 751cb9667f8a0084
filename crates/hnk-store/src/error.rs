//! Error types for hnk-store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hnk-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in hnk-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    // ========================================================================
    // Catalog errors
    // ========================================================================
    /// Catalog I/O error.
    #[error("Catalog I/O error at {path}: {message}")]
    CatalogIo { path: PathBuf, message: String },

    /// Catalog parse error.
    #[error("Catalog parse error at {path}: {message}")]
    CatalogParse { path: PathBuf, message: String },

    /// Catalog not found (not created yet).
    #[error("Catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    /// Referential integrity violation in catalog records.
    #[error("Catalog integrity violation: {message}")]
    IntegrityViolation { message: String },

    /// Catalog incompatible with the active embedding backend.
    #[error("Catalog incompatible: {reason}")]
    CatalogIncompatible { reason: String },

    // ========================================================================
    // Search errors
    // ========================================================================
    /// Query vector dimension mismatch.
    #[error("Query dimension mismatch: catalog has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Record embedding dimension mismatch (caught on insert).
    #[error("Record '{id}' embedding dimension mismatch: expected {expected}, got {actual}")]
    RecordDimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    // ========================================================================
    // General errors
    // ========================================================================
    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a catalog I/O error.
    pub fn catalog_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CatalogIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a catalog parse error.
    pub fn catalog_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CatalogParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an integrity violation error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            message: message.into(),
        }
    }

    /// Create a catalog-incompatible error.
    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::CatalogIncompatible {
            reason: reason.into(),
        }
    }
}
