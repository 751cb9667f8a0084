//! Common types used throughout HNK.
//!
//! This module contains the layer/scope vocabulary, scored candidate types,
//! and the trait seams the narrowing kernel programs against.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::descriptor::SectionRecord;
use crate::errors::HnkError;

// ============================================================================
// Layer
// ============================================================================

/// One stage of the narrowing pipeline.
///
/// Each layer operates over progressively finer-grained descriptor records:
/// project profiles, document descriptors, section records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Coarsest layer: selects the project.
    Project,
    /// Middle layer: selects the document within a project.
    Document,
    /// Finest layer: selects the section within a document.
    Section,
}

impl Layer {
    /// The layer whose resolved ids form this layer's scope.
    ///
    /// `None` at the Project layer, which searches the entire corpus.
    pub fn parent(&self) -> Option<Layer> {
        match self {
            Self::Project => None,
            Self::Document => Some(Self::Project),
            Self::Section => Some(Self::Document),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Document => write!(f, "document"),
            Self::Section => write!(f, "section"),
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

/// The subset of the corpus a layer is permitted to search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// The entire corpus (Project layer only).
    All,
    /// Entities owned by one of the given parent ids.
    Parents(Vec<String>),
}

impl Scope {
    /// Parent ids as a slice, or `None` for the unrestricted scope.
    pub fn parent_ids(&self) -> Option<&[String]> {
        match self {
            Self::All => None,
            Self::Parents(ids) => Some(ids),
        }
    }
}

// ============================================================================
// CandidateFacets
// ============================================================================

/// Retrieval-time attributes carried by a candidate.
///
/// The Ambiguity Scorer derives the discriminating dimension for a
/// clarifying question from these; they come straight from the stored
/// descriptor attribute payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFacets {
    /// Human-readable label (title or summary head; falls back to the id).
    pub label: String,

    /// Document type (documents; aggregated inventory keys for projects).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    /// Dominant themes (projects).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub themes: BTreeSet<String>,

    /// Key topics (documents).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub topics: BTreeSet<String>,

    /// Section title (sections).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ============================================================================
// ScoredCandidate
// ============================================================================

/// A retrieval candidate with its similarity and facets.
///
/// Candidate lists are always sorted by similarity descending with ties
/// broken by id ascending; that ordering is established by the profile
/// store and relied on everywhere downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    /// Entity id at the searched layer.
    pub id: String,

    /// Cosine similarity against the query embedding.
    pub similarity: f32,

    /// Denormalized owning project id (None for project candidates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Attributes used for discriminating-dimension derivation.
    pub facets: CandidateFacets,
}

impl ScoredCandidate {
    /// Display label for questions and result summaries.
    pub fn label(&self) -> &str {
        if self.facets.label.is_empty() {
            &self.id
        } else {
            &self.facets.label
        }
    }
}

// ============================================================================
// Trait seams
// ============================================================================

/// Embeds query text through the configured embedding provider.
///
/// The kernel never computes embeddings itself; implementations bridge to
/// `hnk-embed` backends. A provider failure must already include the
/// provider's single automatic retry; the kernel does not retry again.
pub trait QueryEmbedder: Send + Sync {
    /// Embed one query string.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, HnkError>;

    /// Model identifier of the active backend.
    fn model_id(&self) -> &str;

    /// Embedding dimension of the active backend.
    fn dimension(&self) -> usize;
}

/// Scoped nearest-neighbor search over the descriptor catalog.
///
/// Implementations bridge to `hnk-store`. All methods are read-only.
pub trait ProfileSearch: Send + Sync {
    /// Search one layer within a scope.
    ///
    /// Returns candidates sorted by similarity descending, id ascending on
    /// ties. `scope` of `None` searches the whole layer.
    fn search(
        &self,
        layer: Layer,
        scope: Option<&[String]>,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, HnkError>;

    /// First id from `ids` missing at the given layer, if any.
    fn missing_id(&self, layer: Layer, ids: &[String]) -> Result<Option<String>, HnkError>;

    /// Fetch a full section record for result assembly.
    fn section(&self, section_id: &str) -> Result<Option<SectionRecord>, HnkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_parent() {
        assert_eq!(Layer::Project.parent(), None);
        assert_eq!(Layer::Document.parent(), Some(Layer::Project));
        assert_eq!(Layer::Section.parent(), Some(Layer::Document));
    }

    #[test]
    fn test_layer_display() {
        assert_eq!(Layer::Project.to_string(), "project");
        assert_eq!(Layer::Document.to_string(), "document");
        assert_eq!(Layer::Section.to_string(), "section");
    }

    #[test]
    fn test_scope_parent_ids() {
        assert_eq!(Scope::All.parent_ids(), None);
        let scope = Scope::Parents(vec!["p1".to_string()]);
        assert_eq!(scope.parent_ids().unwrap(), ["p1".to_string()]);
    }

    #[test]
    fn test_candidate_label_falls_back_to_id() {
        let candidate = ScoredCandidate {
            id: "doc-1".to_string(),
            similarity: 0.8,
            project_id: None,
            facets: CandidateFacets::default(),
        };
        assert_eq!(candidate.label(), "doc-1");
    }
}
