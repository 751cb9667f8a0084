//! Deterministic feature-hashing embedding backend.
//!
//! Hashes lowercase word tokens and adjacent-word bigrams into a fixed-size
//! vector, then L2-normalizes. Identical input text always produces the same
//! vector, which keeps narrowing decisions reproducible without a model
//! download or a network dependency.

use crate::config::{EmbedConfig, ModelInfo, ProviderKind};
use crate::error::{EmbedError, EmbedResult};
use crate::EmbeddingBackend;

// FNV-1a parameters (64-bit).
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic feature-hashing embedder.
#[derive(Debug)]
pub struct HashEmbeddingBackend {
    model_info: ModelInfo,
}

impl HashEmbeddingBackend {
    /// Create a hash backend from configuration.
    pub fn new(config: &EmbedConfig) -> EmbedResult<Self> {
        let dimension = config.effective_dimension();
        if dimension == 0 {
            return Err(EmbedError::config(
                "Hash provider requires a non-zero dimension.",
            ));
        }
        Ok(Self {
            model_info: ModelInfo::new(&config.model_id, dimension, ProviderKind::Hash),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let dim = self.model_info.dimension;
        let mut vector = vec![0.0f32; dim];

        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();

        for token in &tokens {
            bump(&mut vector, token.as_bytes());
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            bump(&mut vector, bigram.as_bytes());
        }

        // L2 normalize so cosine similarity reduces to a dot product.
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut vector {
                *val /= norm;
            }
        }
        vector
    }
}

/// Add a hashed feature into the vector with a sign derived from the hash.
fn bump(vector: &mut [f32], feature: &[u8]) {
    let hash = fnv1a(feature);
    let slot = (hash % vector.len() as u64) as usize;
    let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
    vector[slot] += sign;
}

impl EmbeddingBackend for HashEmbeddingBackend {
    fn embed(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }

    fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(dim: usize) -> HashEmbeddingBackend {
        HashEmbeddingBackend::new(&EmbedConfig::hash(dim)).unwrap()
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let b = backend(64);
        let a = b.embed(&["quarterly financial report"]).unwrap();
        let c = b.embed(&["quarterly financial report"]).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_identical_text_cosine_is_one() {
        let b = backend(64);
        let vs = b.embed(&["lease agreement terms", "lease agreement terms"]).unwrap();
        let dot: f32 = vs[0].iter().zip(&vs[1]).map(|(x, y)| x * y).sum();
        assert!((dot - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_different_text_differs() {
        let b = backend(256);
        let vs = b
            .embed(&["database schema migration", "marketing launch timeline"])
            .unwrap();
        let dot: f32 = vs[0].iter().zip(&vs[1]).map(|(x, y)| x * y).sum();
        assert!(dot < 0.9, "unrelated texts should not be near-identical, got {dot}");
    }

    #[test]
    fn test_normalized() {
        let b = backend(64);
        let vs = b.embed(&["some text to embed"]).unwrap();
        let norm: f32 = vs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let b = backend(32);
        let vs = b.embed(&[""]).unwrap();
        assert!(vs[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = EmbedConfig::hash(0);
        config.dimension = Some(0);
        assert!(HashEmbeddingBackend::new(&config).is_err());
    }
}
