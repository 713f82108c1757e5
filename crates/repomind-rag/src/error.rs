//! Error types for the repomind-rag crate

use repomind_common::{ErrorClass, ErrorKind};
use thiserror::Error;

/// Result type alias for RAG operations
pub type RagResult<T> = Result<T, RagError>;

/// Errors raised while assembling context or generating an answer
#[derive(Debug, Error)]
pub enum RagError {
    /// Retrieval failed before generation started
    #[error(transparent)]
    Search(#[from] repomind_search::SearchError),

    /// The LLM rejected our credentials
    #[error("llm unauthorized: {0}")]
    Unauthorized(String),

    /// The LLM throttled us
    #[error("llm rate limited")]
    RateLimited,

    /// The LLM kept failing after local retries
    #[error("llm unavailable: {0}")]
    Upstream(String),

    /// Transport-level failure before a status was received
    #[error("http error: {0}")]
    Http(String),

    /// Stream or response shape did not match the API contract
    #[error("unexpected llm response: {0}")]
    Decode(String),

    /// The caller went away; partial output is discarded
    #[error("cancelled")]
    Cancelled,
}

impl ErrorClass for RagError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Search(e) => e.kind(),
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Upstream(_) | Self::Http(_) => ErrorKind::UpstreamUnavailable,
            Self::Decode(_) => ErrorKind::Internal,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}
