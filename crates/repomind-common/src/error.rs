//! Error taxonomy shared by every repomind crate
//!
//! Each crate defines its own `thiserror` enum for local detail, then maps
//! it into [`ErrorKind`] via [`ErrorClass`] so the HTTP layer and the SSE
//! stream can surface a stable, machine-readable kind.

use serde::{Deserialize, Serialize};

/// The closed set of error kinds surfaced to callers
///
/// Retry policy hangs off the kind: upstream failures are retried locally
/// before becoming `UpstreamUnavailable`; `BadInput` and `NotFound` are
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Caller supplied something unusable (malformed URL, empty query)
    BadInput,
    /// Repository, job, or index does not exist
    NotFound,
    /// Upstream rejected our credentials
    Unauthorized,
    /// Upstream quota exhausted; retry after the hinted delay
    RateLimited,
    /// Upstream kept failing after local retries
    UpstreamUnavailable,
    /// Stored embedding model does not match the requested one
    SchemaMismatch,
    /// The request or job was cancelled by its owner
    Cancelled,
    /// Anything we cannot blame on the caller or an upstream
    Internal,
}

impl ErrorKind {
    /// Stable wire identifier, used in HTTP error bodies and SSE `error` events
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadInput => "bad-input",
            Self::NotFound => "not-found",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate-limited",
            Self::UpstreamUnavailable => "upstream-unavailable",
            Self::SchemaMismatch => "schema-mismatch",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }

    /// Whether a local retry can plausibly help
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::UpstreamUnavailable)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every crate error so callers can classify without
/// matching on crate-local variants
pub trait ErrorClass {
    /// The taxonomy bucket this error belongs to
    fn kind(&self) -> ErrorKind;
}
