//! Adapter bridging the `hnk-store` catalog into kernel trait seams.
//!
//! Keeps storage types out of the kernel's public API: the orchestrator
//! only ever sees [`ProfileSearch`], [`ScoredCandidate`], and [`HnkError`].

use hnk_store::{ProfileCatalog, RecordLayer, StoreError};

use crate::descriptor::{facets_from_attributes, SectionRecord};
use crate::errors::HnkError;
use crate::types::{Layer, ProfileSearch, ScoredCandidate};

/// Convert a store error into the kernel error taxonomy.
pub fn from_store_error(err: StoreError) -> HnkError {
    match err {
        StoreError::CatalogIo { path, message } => HnkError::CatalogIo { path, message },
        StoreError::CatalogParse { path, message } => HnkError::CatalogParse { path, message },
        StoreError::CatalogNotFound { .. } => HnkError::CorpusNotLoaded,
        StoreError::IntegrityViolation { message } => HnkError::CatalogIntegrity(message),
        StoreError::CatalogIncompatible { reason } => HnkError::CatalogIncompatible { reason },
        StoreError::DimensionMismatch { expected, actual } => HnkError::CatalogIncompatible {
            reason: format!(
                "query dimension {} does not match catalog dimension {}",
                actual, expected
            ),
        },
        StoreError::RecordDimensionMismatch { id, expected, actual } => {
            HnkError::CatalogIntegrity(format!(
                "record '{}' has dimension {}, catalog expects {}",
                id, actual, expected
            ))
        }
        StoreError::Io(e) => HnkError::Io(e),
        StoreError::Json(e) => HnkError::Json(e),
    }
}

fn record_layer(layer: Layer) -> RecordLayer {
    match layer {
        Layer::Project => RecordLayer::Project,
        Layer::Document => RecordLayer::Document,
        Layer::Section => RecordLayer::Section,
    }
}

/// [`ProfileSearch`] implementation over a loaded catalog.
#[derive(Debug)]
pub struct CatalogSearch {
    catalog: ProfileCatalog,
}

impl CatalogSearch {
    /// Wrap a loaded catalog.
    pub fn new(catalog: ProfileCatalog) -> Self {
        Self { catalog }
    }

    /// The wrapped catalog.
    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }
}

impl ProfileSearch for CatalogSearch {
    fn search(
        &self,
        layer: Layer,
        scope: Option<&[String]>,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, HnkError> {
        let hits = self
            .catalog
            .search(record_layer(layer), scope, query, top_k)
            .map_err(from_store_error)?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let facets = facets_from_attributes(layer, &hit.attributes);
                ScoredCandidate {
                    id: hit.id,
                    similarity: hit.score,
                    project_id: hit.project_id,
                    facets,
                }
            })
            .collect())
    }

    fn missing_id(&self, layer: Layer, ids: &[String]) -> Result<Option<String>, HnkError> {
        Ok(self
            .catalog
            .missing_id(record_layer(layer), ids)
            .map(|s| s.to_string()))
    }

    fn section(&self, section_id: &str) -> Result<Option<SectionRecord>, HnkError> {
        match self.catalog.get(RecordLayer::Section, section_id) {
            Some(record) => Ok(Some(SectionRecord::from_record(record)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
