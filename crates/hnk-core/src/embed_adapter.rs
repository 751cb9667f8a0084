//! Adapter bridging `hnk-embed` backends into the kernel's embedder seam.

use hnk_embed::{EmbedError, EmbeddingBackend};

use crate::errors::HnkError;
use crate::types::QueryEmbedder;

/// Convert an embedding error into the kernel error taxonomy.
///
/// Transport failures map to [`HnkError::EmbeddingUnavailable`] with the
/// provider's retry already spent; configuration problems surface as
/// configuration errors.
pub fn from_embed_error(err: EmbedError) -> HnkError {
    match err {
        EmbedError::Config { message } => HnkError::InvalidConfiguration {
            message,
            hint: "Check the `embedding` section of your config.".to_string(),
        },
        other => HnkError::EmbeddingUnavailable {
            retryable: other.is_retryable(),
            reason: other.to_string(),
        },
    }
}

/// [`QueryEmbedder`] implementation over any embedding backend.
#[derive(Debug)]
pub struct BackendEmbedder {
    backend: Box<dyn EmbeddingBackend>,
}

impl BackendEmbedder {
    /// Wrap a backend.
    pub fn new(backend: Box<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    /// Borrow the wrapped backend.
    pub fn backend(&self) -> &dyn EmbeddingBackend {
        self.backend.as_ref()
    }

    /// Embed a batch of descriptor texts (used by corpus loading).
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, HnkError> {
        self.backend.embed(texts).map_err(from_embed_error)
    }
}

impl QueryEmbedder for BackendEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, HnkError> {
        self.backend.embed_one(text).map_err(from_embed_error)
    }

    fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    fn dimension(&self) -> usize {
        self.backend.dimension()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hnk_embed::{create_embedding_backend, EmbedConfig};

    #[test]
    fn test_backend_embedder_round_trip() {
        let backend = create_embedding_backend(&EmbedConfig::hash(32)).unwrap();
        let embedder = BackendEmbedder::new(backend);

        let vector = embedder.embed_query("lease termination").unwrap();
        assert_eq!(vector.len(), 32);
        assert_eq!(embedder.dimension(), 32);
        assert_eq!(embedder.model_id(), "feature-hash-32");
    }

    #[test]
    fn test_config_error_maps_to_configuration() {
        let err = from_embed_error(EmbedError::config("missing endpoint"));
        assert!(matches!(err, HnkError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_transport_error_is_retryable() {
        let err = from_embed_error(EmbedError::ServiceUnreachable {
            endpoint: "http://localhost:1".to_string(),
            message: "connection refused".to_string(),
            retried: true,
        });
        assert!(err.is_retryable());
    }
}
