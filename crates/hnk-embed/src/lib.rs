//! # hnk-embed
//!
//! Embedding provider boundary for HNK.
//!
//! The narrowing kernel treats embedding computation as an external
//! capability: it calls a backend, it never implements inference. This crate
//! provides:
//!
//! - **[`EmbeddingBackend`]**: the trait the kernel programs against
//! - **HTTP backend**: client for a remote embedding service, with request
//!   timeout and a single automatic retry on transport failure
//! - **Hash backend**: deterministic feature-hashing embedder for offline
//!   use and reproducible tests
//!
//! ## Determinism
//!
//! Narrowing decisions must be reproducible across retries, so a backend is
//! required to return identical vectors for identical input within a single
//! corpus version. The hash backend guarantees this by construction; a
//! remote service must be pinned to a fixed model revision.
//!
//! ## Features
//!
//! - `http` (default): remote service client via `reqwest`
//!
//! ## Usage
//!
//! ```ignore
//! use hnk_embed::{create_embedding_backend, EmbedConfig};
//!
//! let config = EmbedConfig::hash(256);
//! let backend = create_embedding_backend(&config)?;
//! let vectors = backend.embed(&["Where is the Q3 budget summary?"])?;
//! assert_eq!(vectors[0].len(), backend.dimension());
//! ```

pub mod config;
pub mod error;

mod hash;

#[cfg(feature = "http")]
mod http;

// Re-export error types
pub use error::{EmbedError, EmbedResult};

// Re-export config types (canonical source of truth)
pub use config::{
    EmbedConfig, ModelInfo, ProviderKind, DEFAULT_HASH_DIMENSION, DEFAULT_TIMEOUT_MS,
};

pub use hash::HashEmbeddingBackend;

#[cfg(feature = "http")]
pub use http::HttpEmbeddingBackend;

/// Default model ID when none is configured.
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "nomic-embed-text";

// ============================================================================
// Embedding Backend Trait
// ============================================================================

/// Trait for embedding backends.
///
/// Maps text to fixed-dimension dense vectors for cosine-similarity search.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across sessions.
pub trait EmbeddingBackend: Send + Sync + std::fmt::Debug {
    /// Generate embeddings for a batch of texts.
    ///
    /// Returns one vector per input text, each of length `dimension()`.
    fn embed(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    fn embed_one(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let mut vectors = self.embed(&[text])?;
        vectors.pop().ok_or_else(|| {
            EmbedError::invalid_response("Backend returned no vector for a single input")
        })
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get backend information (model ID, dimension, provider).
    fn model_info(&self) -> &ModelInfo;

    /// Get the model ID.
    fn model_id(&self) -> &str {
        &self.model_info().model_id
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create an embedding backend from configuration.
///
/// # Errors
///
/// Returns [`EmbedError`] if the configuration is invalid or the requested
/// provider is not compiled in.
pub fn create_embedding_backend(config: &EmbedConfig) -> EmbedResult<Box<dyn EmbeddingBackend>> {
    match config.provider {
        ProviderKind::Hash => Ok(Box::new(HashEmbeddingBackend::new(config)?)),
        #[cfg(feature = "http")]
        ProviderKind::Http => Ok(Box::new(HttpEmbeddingBackend::new(config)?)),
        #[cfg(not(feature = "http"))]
        ProviderKind::Http => Err(EmbedError::provider_unavailable(
            "http",
            "This build does not include the HTTP provider. Enable the 'http' feature.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creates_hash_backend() {
        let backend = create_embedding_backend(&EmbedConfig::hash(64)).unwrap();
        assert_eq!(backend.dimension(), 64);
        assert_eq!(backend.model_id(), "feature-hash-64");
    }

    #[test]
    fn test_embed_one_matches_batch() {
        let backend = create_embedding_backend(&EmbedConfig::hash(64)).unwrap();
        let single = backend.embed_one("payment terms").unwrap();
        let batch = backend.embed(&["payment terms"]).unwrap();
        assert_eq!(single, batch[0]);
    }
}
