//! Layer engine: one retrieval-and-decide step of the narrowing pipeline.
//!
//! The same engine runs at all three layers; only the thresholds and scope
//! semantics differ. A call embeds the query, fetches the top-k nearest
//! descriptors within scope, and hands the ranked list to the ambiguity
//! scorer. No side effects beyond read-only queries.

use tracing::debug;

use crate::errors::HnkError;
use crate::scorer::{decide, Decision, LayerThresholds};
use crate::types::{Layer, ProfileSearch, QueryEmbedder, Scope};

/// One narrowing layer, parameterized by thresholds.
#[derive(Debug, Clone)]
pub struct LayerEngine {
    layer: Layer,
    thresholds: LayerThresholds,
}

impl LayerEngine {
    /// Create a layer engine.
    pub fn new(layer: Layer, thresholds: LayerThresholds) -> Self {
        Self { layer, thresholds }
    }

    /// The layer this engine narrows.
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// The thresholds in effect.
    pub fn thresholds(&self) -> &LayerThresholds {
        &self.thresholds
    }

    /// Run one narrowing step.
    ///
    /// `scope` restricts candidates to entities owned by the given parent
    /// ids (`Scope::All` only at the Project layer). `tolerate_pair` enables
    /// Project-layer pair acceptance after an answered clarification.
    ///
    /// # Errors
    ///
    /// - [`HnkError::ScopeNotFound`] when a scope id is absent from the
    ///   catalog (e.g., deleted project mid-session).
    /// - [`HnkError::EmbeddingUnavailable`] when the provider fails; the
    ///   provider's single retry is already spent, so the failure is
    ///   surfaced rather than retried again — retrieval on a bad vector
    ///   would be worse than failing the turn.
    pub fn narrow(
        &self,
        query: &str,
        scope: &Scope,
        tolerate_pair: bool,
        embedder: &dyn QueryEmbedder,
        store: &dyn ProfileSearch,
    ) -> Result<Decision, HnkError> {
        if let Some(parent_ids) = scope.parent_ids() {
            let parent_layer = self.layer.parent().ok_or_else(|| {
                HnkError::InvalidArgument(format!(
                    "{} layer does not accept a parent scope",
                    self.layer
                ))
            })?;
            if let Some(missing) = store.missing_id(parent_layer, parent_ids)? {
                return Err(HnkError::ScopeNotFound {
                    layer: self.layer,
                    scope_id: missing,
                });
            }
        }

        let embedding = embedder.embed_query(query)?;
        let candidates = store.search(
            self.layer,
            scope.parent_ids(),
            &embedding,
            self.thresholds.top_k,
        )?;

        debug!(
            layer = %self.layer,
            candidates = candidates.len(),
            top_similarity = candidates.first().map(|c| c.similarity),
            "Layer retrieval complete"
        );

        Ok(decide(&candidates, &self.thresholds, tolerate_pair))
    }
}

// ============================================================================
// Tests
// ============================================================================
