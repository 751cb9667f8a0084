//! Configuration types for hnk-embed.
//!
//! This module provides the canonical configuration types for embedding
//! backends. Other crates should use or re-export these types rather than
//! defining duplicates.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_EMBEDDING_MODEL_ID;

// ============================================================================
// ProviderKind
// ============================================================================

/// Embedding provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote embedding service reached over HTTP.
    #[default]
    Http,
    /// Deterministic local feature-hashing embedder (offline, tests).
    Hash,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Hash => write!(f, "hash"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "remote" | "service" => Ok(Self::Http),
            "hash" | "local" => Ok(Self::Hash),
            _ => Err(format!("Unknown provider: '{}'. Use 'http' or 'hash'.", s)),
        }
    }
}

// ============================================================================
// EmbedConfig
// ============================================================================

/// Default request timeout for the HTTP backend, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default embedding dimension for the hash backend.
pub const DEFAULT_HASH_DIMENSION: usize = 256;

/// Resolved embedding backend configuration.
///
/// # Example YAML
///
/// ```yaml
/// embedding:
///   provider: http
///   modelId: nomic-embed-text
///   endpoint: http://localhost:11434/api/embed
///   dimension: 768
///   timeoutMs: 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model identifier passed to the provider and recorded in catalog metadata.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// HTTP endpoint for the remote provider. Required when `provider` is `http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Embedding dimension. Required when `provider` is `http`; defaults to
    /// [`DEFAULT_HASH_DIMENSION`] for the hash provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Per-request timeout in milliseconds (HTTP provider only).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Http,
            model_id: default_model_id(),
            endpoint: None,
            dimension: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl EmbedConfig {
    /// Configuration for the deterministic hash backend.
    pub fn hash(dimension: usize) -> Self {
        Self {
            provider: ProviderKind::Hash,
            model_id: format!("feature-hash-{}", dimension),
            endpoint: None,
            dimension: Some(dimension),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Configuration for a remote HTTP backend.
    pub fn http(endpoint: impl Into<String>, model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            provider: ProviderKind::Http,
            model_id: model_id.into(),
            endpoint: Some(endpoint.into()),
            dimension: Some(dimension),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Effective embedding dimension for this configuration.
    pub fn effective_dimension(&self) -> usize {
        match self.provider {
            ProviderKind::Hash => self.dimension.unwrap_or(DEFAULT_HASH_DIMENSION),
            ProviderKind::Http => self.dimension.unwrap_or(0),
        }
    }
}

// ============================================================================
// ModelInfo
// ============================================================================

/// Information about a loaded embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model identifier (e.g., "nomic-embed-text").
    pub model_id: String,

    /// Embedding dimension.
    pub dimension: usize,

    /// Provider kind as string.
    pub provider: String,
}

impl ModelInfo {
    /// Create model info.
    pub fn new(model_id: impl Into<String>, dimension: usize, provider: ProviderKind) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            provider: provider.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!(ProviderKind::from_str("http").unwrap(), ProviderKind::Http);
        assert_eq!(ProviderKind::from_str("remote").unwrap(), ProviderKind::Http);
        assert_eq!(ProviderKind::from_str("hash").unwrap(), ProviderKind::Hash);
        assert_eq!(ProviderKind::from_str("local").unwrap(), ProviderKind::Hash);
        assert!(ProviderKind::from_str("candle").is_err());
    }

    #[test]
    fn test_hash_config_dimension() {
        let config = EmbedConfig::hash(128);
        assert_eq!(config.effective_dimension(), 128);
        assert_eq!(config.model_id, "feature-hash-128");
    }

    #[test]
    fn test_default_config_serialization() {
        let config = EmbedConfig::default();
        let yaml = serde_json::to_string(&config).unwrap();
        assert!(yaml.contains("\"provider\":\"http\""));
        assert!(yaml.contains("timeoutMs"));
    }
}
