//! Storage abstraction for chunk vectors
//!
//! One trait covers the write path (the strategy-deciding writer) and
//! the read path (repo-scoped cosine search), so tests can substitute an
//! in-memory implementation for both.

use async_trait::async_trait;
use repomind_common::CorrelationId;
use repomind_meta_data::RepoIndexRecord;
use repomind_parsing::Chunk;
use serde::{Deserialize, Serialize};

use crate::error::VectorDataResult;

/// Everything the writer needs to know about the ingestion it persists
#[derive(Debug, Clone)]
pub struct WriteContext {
    /// Canonical "owner/name"
    pub repo_id: String,
    /// Commit the snapshot was taken at
    pub commit_hash: String,
    pub default_branch: String,
    /// Model that produced the vectors being written
    pub model: String,
}

/// What the writer decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteStrategy {
    /// Same commit, same model, already ready: nothing written
    Skipped,
    /// Same model: new rows inserted, stale rows removed
    Upsert,
    /// Model (or schema) changed: everything replaced
    FullReindex,
}

impl WriteStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Upsert => "upsert",
            Self::FullReindex => "full-reindex",
        }
    }
}

impl std::fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writer result
#[derive(Debug, Clone, Copy)]
pub struct WriteOutcome {
    pub strategy: WriteStrategy,
    pub chunks_written: usize,
}

/// Parameters for one cosine search
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Repository scope; search never crosses repositories
    pub repo_id: String,
    pub embedding: Vec<f32>,
    pub limit: usize,
    /// Candidates below this vector score are dropped in the store
    pub min_score: f32,
    /// Optional SQL-LIKE pattern on file paths
    pub file_filter: Option<String>,
}

/// One candidate from the store, scored by cosine similarity
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// 1 - cosine distance, in [0, 1] for the embedding models we use
    pub vector_score: f32,
}

/// Capability for persisting and searching chunk vectors
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist one ingestion's chunks under the writer policy
    ///
    /// Decision (under the per-repo advisory lock, one transaction):
    /// same commit + same model + ready means skip; model change means
    /// full reindex; otherwise upsert with stale-row removal. The index
    /// record transitions to `ready` on success and `failed` on error,
    /// leaving the prior snapshot's chunks in place.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` when the vectors or model tag do not match the
    /// store's declared space; `Storage` for database failures.
    async fn write(
        &self,
        chunks: &[Chunk],
        context: &WriteContext,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<WriteOutcome>;

    /// Repo-scoped cosine search, best score first
    ///
    /// # Errors
    ///
    /// `Storage` for database failures.
    async fn search(
        &self,
        query: &SearchQuery,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<ScoredChunk>>;

    /// Read the index record backing a repository's vectors
    ///
    /// # Errors
    ///
    /// `Storage` for database failures.
    async fn get_index(&self, repo_id: &str) -> VectorDataResult<Option<RepoIndexRecord>>;
}
