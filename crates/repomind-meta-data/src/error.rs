//! Error types for the repomind-meta-data crate

use repomind_common::{ErrorClass, ErrorKind};
use thiserror::Error;

/// Result type alias for metadata operations
pub type MetaResult<T> = Result<T, MetaError>;

/// Errors raised by the metadata layer
#[derive(Debug, Error)]
pub enum MetaError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Database(String),

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Migration failure at startup
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for MetaError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}

impl ErrorClass for MetaError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Database(_) | Self::Migration(_) => ErrorKind::Internal,
        }
    }
}
