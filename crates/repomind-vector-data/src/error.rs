//! Error types for the repomind-vector-data crate

use repomind_common::{ErrorClass, ErrorKind};
use thiserror::Error;

/// Result type alias for vector storage operations
pub type VectorDataResult<T> = Result<T, VectorDataError>;

/// Errors raised by the vector store
#[derive(Debug, Error)]
pub enum VectorDataError {
    /// Query or connection failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Vectors or model tag do not match the store's declared space
    #[error("model space mismatch: {0}")]
    SchemaMismatch(String),

    /// A chunk arrived without an embedding attached
    #[error("chunk {0} has no embedding")]
    MissingEmbedding(uuid::Uuid),
}

impl From<sqlx::Error> for VectorDataError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl ErrorClass for VectorDataError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Self::Storage(_) | Self::MissingEmbedding(_) => ErrorKind::Internal,
        }
    }
}
