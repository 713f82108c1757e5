//! Embedding provider capability

use async_trait::async_trait;

use crate::error::EmbeddingResult;

/// What the vector will be used for
///
/// Index-time and query-time embeddings live in different regions of the
/// model's space; mixing the two task types silently degrades recall, so
/// every call site must say which side it is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Index-time chunk embedding
    RetrievalDocument,
    /// Query-time question embedding
    RetrievalQuery,
}

impl EmbeddingTask {
    /// Wire value understood by the embedding API
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Capability for turning texts into fixed-width vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one batch, preserving input order
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, upstream rejections, or
    /// vectors of the wrong width. A batch either fully succeeds or
    /// fully fails; partial output is never returned.
    async fn embed_batch(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Width of every vector this provider produces
    fn dimension(&self) -> usize;

    /// Model identifier recorded alongside stored vectors
    fn model_name(&self) -> &str;
}
