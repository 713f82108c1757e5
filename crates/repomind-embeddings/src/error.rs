//! Error types for the repomind-embeddings crate

use repomind_common::{ErrorClass, ErrorKind};
use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors raised while generating embeddings
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding API rejected our credentials
    #[error("embedding service unauthorized: {0}")]
    Unauthorized(String),

    /// The embedding API throttled us
    #[error("embedding service rate limited")]
    RateLimited,

    /// The embedding API kept failing after local retries
    #[error("embedding service unavailable: {0}")]
    Upstream(String),

    /// Transport-level failure before a status was received
    #[error("http error: {0}")]
    Http(String),

    /// The service returned vectors of the wrong width
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// Response shape did not match the documented API
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Anything else
    #[error("embedding error: {0}")]
    Other(String),
}

impl ErrorClass for EmbeddingError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Upstream(_) | Self::Http(_) => ErrorKind::UpstreamUnavailable,
            Self::Dimension { .. } => ErrorKind::SchemaMismatch,
            Self::Decode(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }
}

impl EmbeddingError {
    /// Whether a local retry can plausibly help
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Upstream(_) | Self::Http(_))
    }
}
