//! Error types for the repomind-search crate

use repomind_common::{ErrorClass, ErrorKind};
use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised on the retrieval path
#[derive(Debug, Error)]
pub enum SearchError {
    /// Empty or unusable query
    #[error("bad query: {0}")]
    BadQuery(String),

    /// Repository has no servable index
    #[error("repository {0} is not indexed")]
    NotIndexed(String),

    /// Stored vectors came from a different model; refusing to mix spaces
    #[error("index built with model '{stored}', queries use '{requested}'")]
    SchemaMismatch { stored: String, requested: String },

    /// Query embedding failed
    #[error(transparent)]
    Embedding(#[from] repomind_embeddings::EmbeddingError),

    /// Vector store failed
    #[error(transparent)]
    Storage(#[from] repomind_vector_data::VectorDataError),
}

impl ErrorClass for SearchError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::BadQuery(_) => ErrorKind::BadInput,
            Self::NotIndexed(_) => ErrorKind::NotFound,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::Embedding(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }
}
