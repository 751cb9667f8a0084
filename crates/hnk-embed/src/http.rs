//! HTTP embedding backend.
//!
//! Talks to a remote embedding service (Ollama-compatible request shape:
//! `POST {endpoint}` with `{"model": ..., "input": [...]}` returning
//! `{"embeddings": [[f32, ...], ...]}`).
//!
//! ## Failure policy
//!
//! A timed-out or unreachable request is retried exactly once, then surfaced
//! as [`EmbedError::ServiceUnreachable`] with `retried: true`. Non-success
//! HTTP statuses and malformed bodies are surfaced immediately; a bad vector
//! is worse than a failed request, so there is no silent degradation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EmbedConfig, ModelInfo, ProviderKind};
use crate::error::{EmbedError, EmbedResult};
use crate::EmbeddingBackend;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Remote embedding service client.
#[derive(Debug)]
pub struct HttpEmbeddingBackend {
    model_info: ModelInfo,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpEmbeddingBackend {
    /// Create an HTTP backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Config`] if the endpoint or dimension is missing.
    pub fn new(config: &EmbedConfig) -> EmbedResult<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| EmbedError::config("HTTP provider requires an `endpoint` setting."))?;

        let dimension = config.dimension.ok_or_else(|| {
            EmbedError::config("HTTP provider requires an explicit `dimension` setting.")
        })?;
        if dimension == 0 {
            return Err(EmbedError::config("Embedding dimension must be non-zero."));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| EmbedError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model_info: ModelInfo::new(&config.model_id, dimension, ProviderKind::Http),
            endpoint,
            client,
        })
    }

    fn request(&self, texts: &[&str]) -> Result<EmbedResponse, reqwest::Error> {
        let body = EmbedRequest {
            model: &self.model_info.model_id,
            input: texts,
        };
        self.client
            .post(&self.endpoint)
            .json(&body)
            .send()?
            .error_for_status()?
            .json::<EmbedResponse>()
    }

    fn classify(&self, err: reqwest::Error, retried: bool) -> EmbedError {
        if let Some(status) = err.status() {
            return EmbedError::RequestFailed {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return EmbedError::invalid_response(err.to_string());
        }
        EmbedError::ServiceUnreachable {
            endpoint: self.endpoint.clone(),
            message: err.to_string(),
            retried,
        }
    }
}

impl EmbeddingBackend for HttpEmbeddingBackend {
    fn embed(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>> {
        debug!(
            endpoint = %self.endpoint,
            count = texts.len(),
            "Embedding batch via HTTP provider"
        );

        let response = match self.request(texts) {
            Ok(r) => r,
            Err(first) => {
                // Timeouts and connection failures get one automatic retry;
                // anything else surfaces straight away.
                if first.is_timeout() || first.is_connect() {
                    warn!(
                        endpoint = %self.endpoint,
                        "Embedding request failed ({}), retrying once",
                        first
                    );
                    self.request(texts).map_err(|e| self.classify(e, true))?
                } else {
                    return Err(self.classify(first, false));
                }
            }
        };

        if response.embeddings.len() != texts.len() {
            return Err(EmbedError::invalid_response(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        let expected = self.model_info.dimension;
        for vector in &response.embeddings {
            if vector.len() != expected {
                return Err(EmbedError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        Ok(response.embeddings)
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

    #[test]
    fn test_missing_endpoint_rejected() {
        let config = EmbedConfig {
            provider: ProviderKind::Http,
            endpoint: None,
            dimension: Some(768),
            ..Default::default()
        };
        assert!(matches!(
            HttpEmbeddingBackend::new(&config),
            Err(EmbedError::Config { .. })
        ));
    }

    #[test]
    fn test_missing_dimension_rejected() {
        let config = EmbedConfig {
            provider: ProviderKind::Http,
            endpoint: Some("http://localhost:11434/api/embed".to_string()),
            dimension: None,
            ..Default::default()
        };
        assert!(matches!(
            HttpEmbeddingBackend::new(&config),
            Err(EmbedError::Config { .. })
        ));
    }

    #[test]
    fn test_unreachable_service_surfaces_after_retry() {
        // Nothing listens on this port; connect fails fast, retries once,
        // then surfaces as ServiceUnreachable with retried=true.
        let config = EmbedConfig {
            provider: ProviderKind::Http,
            endpoint: Some("http://127.0.0.1:1/api/embed".to_string()),
            dimension: Some(8),
            timeout_ms: 500,
            ..Default::default()
        };
        let backend = HttpEmbeddingBackend::new(&config).unwrap();
        match backend.embed(&["hello"]) {
            Err(EmbedError::ServiceUnreachable { retried, .. }) => assert!(retried),
            other => panic!("Expected ServiceUnreachable, got {:?}", other.map(|_| ())),
        }
    }
}
