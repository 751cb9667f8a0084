//! Catalog metadata and compatibility checking.
//!
//! The catalog records which embedding model produced its vectors. A catalog
//! embedded with one model must never be searched with query vectors from
//! another; similarities across models are meaningless and would corrupt
//! narrowing decisions silently.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Catalog metadata filename.
pub const META_FILENAME: &str = "meta.json";

// ============================================================================
// CatalogMeta
// ============================================================================

/// On-disk metadata for a descriptor catalog.
///
/// Stored in `<catalog>/meta.json` and describes the embedding backend that
/// produced the stored vectors plus record counts per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    /// Embedding provider kind as string.
    pub embedding_provider: String,

    /// Embedding model ID used to create vectors.
    pub embedding_model_id: String,

    /// Vector dimension.
    pub dimension: usize,

    /// Monotonically increasing corpus version label.
    pub corpus_version: String,

    /// Number of project profiles.
    pub project_count: u64,

    /// Number of document descriptors.
    pub document_count: u64,

    /// Number of section records.
    pub section_count: u64,

    /// Timestamp when the catalog was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last catalog update.
    pub last_updated_at: DateTime<Utc>,
}

impl CatalogMeta {
    /// Create fresh metadata for a new catalog.
    pub fn new(
        provider: impl Into<String>,
        model_id: impl Into<String>,
        dimension: usize,
        corpus_version: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            embedding_provider: provider.into(),
            embedding_model_id: model_id.into(),
            dimension,
            corpus_version: corpus_version.into(),
            project_count: 0,
            document_count: 0,
            section_count: 0,
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Update the last_updated_at timestamp to now.
    pub fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }
}

// ============================================================================
// CatalogCompatibility
// ============================================================================

/// Result of checking catalog compatibility against the active backend.
#[derive(Debug, Clone)]
pub enum CatalogCompatibility {
    /// Catalog vectors match the active embedding backend.
    Compatible,

    /// Metadata file is missing (catalog not created yet).
    MissingMeta,

    /// Embedding model mismatch.
    ModelMismatch {
        /// Model ID of the active backend.
        active_model: String,
        /// Model ID stored in catalog metadata.
        catalog_model: String,
    },

    /// Vector dimension mismatch.
    DimensionMismatch {
        /// Dimension of the active backend.
        active: usize,
        /// Dimension stored in catalog metadata.
        catalog: usize,
    },
}

impl CatalogCompatibility {
    /// Check if the catalog is compatible.
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible)
    }
}

/// Check catalog compatibility with the active embedding backend.
///
/// Checks model ID first, then dimension.
pub fn check_catalog_compatibility(
    meta: Option<&CatalogMeta>,
    active_model: &str,
    active_dimension: usize,
) -> CatalogCompatibility {
    let Some(meta) = meta else {
        return CatalogCompatibility::MissingMeta;
    };

    if meta.embedding_model_id != active_model {
        return CatalogCompatibility::ModelMismatch {
            active_model: active_model.to_string(),
            catalog_model: meta.embedding_model_id.clone(),
        };
    }

    if meta.dimension != active_dimension {
        return CatalogCompatibility::DimensionMismatch {
            active: active_dimension,
            catalog: meta.dimension,
        };
    }

    CatalogCompatibility::Compatible
}

// ============================================================================
// Load / save
// ============================================================================

/// Load catalog metadata from disk.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_catalog_meta(path: &Path) -> StoreResult<Option<CatalogMeta>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| StoreError::catalog_io(path, e.to_string()))?;

    let meta: CatalogMeta = serde_json::from_str(&content)
        .map_err(|e| StoreError::catalog_parse(path, e.to_string()))?;

    Ok(Some(meta))
}

/// Write catalog metadata to disk.
pub fn write_catalog_meta(path: &Path, meta: &CatalogMeta) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::catalog_io(path, format!("Failed to create directory: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(meta)?;
    fs::write(path, content).map_err(|e| StoreError::catalog_io(path, e.to_string()))?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_meta() -> CatalogMeta {
        CatalogMeta::new("hash", "feature-hash-64", 64, "v1")
    }

    #[test]
    fn test_compatibility_missing() {
        let result = check_catalog_compatibility(None, "feature-hash-64", 64);
        assert!(matches!(result, CatalogCompatibility::MissingMeta));
    }

    #[test]
    fn test_compatibility_compatible() {
        let meta = test_meta();
        let result = check_catalog_compatibility(Some(&meta), "feature-hash-64", 64);
        assert!(result.is_compatible());
    }

    #[test]
    fn test_compatibility_model_mismatch() {
        let meta = test_meta();
        match check_catalog_compatibility(Some(&meta), "other-model", 64) {
            CatalogCompatibility::ModelMismatch {
                active_model,
                catalog_model,
            } => {
                assert_eq!(active_model, "other-model");
                assert_eq!(catalog_model, "feature-hash-64");
            }
            other => panic!("Expected ModelMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_compatibility_dimension_mismatch() {
        let meta = test_meta();
        match check_catalog_compatibility(Some(&meta), "feature-hash-64", 128) {
            CatalogCompatibility::DimensionMismatch { active, catalog } => {
                assert_eq!(active, 128);
                assert_eq!(catalog, 64);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_load_write_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(META_FILENAME);
        let meta = test_meta();

        write_catalog_meta(&path, &meta).unwrap();
        let loaded = load_catalog_meta(&path).unwrap().unwrap();

        assert_eq!(loaded.embedding_model_id, meta.embedding_model_id);
        assert_eq!(loaded.dimension, meta.dimension);
        assert_eq!(loaded.corpus_version, meta.corpus_version);
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(META_FILENAME);
        assert!(load_catalog_meta(&path).unwrap().is_none());
    }
}
