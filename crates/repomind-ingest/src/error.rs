//! Error types for the repomind-ingest crate

use repomind_common::{ErrorClass, ErrorKind};
use thiserror::Error;

/// Result type alias for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised while fetching a repository snapshot
#[derive(Debug, Error)]
pub enum IngestError {
    /// Repository, branch, or tree does not exist upstream
    #[error("not found: {0}")]
    NotFound(String),

    /// GitHub rejected our token (or anonymous access)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream quota exhausted
    #[error("rate limited{}", retry_after.map_or(String::new(), |s| format!(" (retry after {s}s)")))]
    RateLimited {
        /// Seconds to wait, when the upstream said so
        retry_after: Option<u64>,
    },

    /// Upstream kept failing after local retries
    #[error("github unavailable: {0}")]
    Upstream(String),

    /// Transport-level failure before any status was received
    #[error("http error: {0}")]
    Http(String),

    /// A response body did not match the documented shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ErrorClass for IngestError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Upstream(_) | Self::Http(_) => ErrorKind::UpstreamUnavailable,
            Self::Decode(_) => ErrorKind::Internal,
        }
    }
}
