//! Error types for hnk-embed.

use thiserror::Error;

/// Result type alias for hnk-embed operations.
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Errors that can occur while producing embeddings.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The requested provider is not available (wrong feature set or config).
    #[error("Embedding provider '{provider}' is unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// The remote embedding service could not be reached.
    ///
    /// `retried` records whether the automatic retry was already spent.
    #[error("Embedding service unreachable at {endpoint}: {message} (retried: {retried})")]
    ServiceUnreachable {
        endpoint: String,
        message: String,
        retried: bool,
    },

    /// The remote embedding service returned a non-success status.
    #[error("Embedding request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The service response could not be decoded.
    #[error("Invalid embedding response: {message}")]
    InvalidResponse { message: String },

    /// The returned vector does not match the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration error.
    #[error("Embedding configuration error: {message}")]
    Config { message: String },
}

impl EmbedError {
    /// Create a provider-unavailable error.
    pub fn provider_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry the whole turn later.
    ///
    /// Transport-level failures are retryable; config and decode errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnreachable { .. } | Self::RequestFailed { status: 500..=599, .. }
        )
    }
}
