//! One ingestion job, end to end
//!
//! Runs fetch → filter → chunk → embed → write sequentially with
//! per-stage progress reporting. Stage boundaries double as cancellation
//! checkpoints; a cancelled or failed job flips the job record without
//! touching the previous ready snapshot.

use std::sync::Arc;

use repomind_common::{CorrelationId, ErrorClass, ErrorKind, RepoId};
use repomind_embeddings::ChunkEmbedder;
use repomind_ingest::GithubFetcher;
use repomind_meta_data::{IndexJob, IndexStatus, MetaRepository};
use repomind_parsing::{Chunk, Chunker};
use repomind_vector_data::{VectorStore, WriteContext, WriteOutcome};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Per-stage progress marks (percent of the job)
const PROGRESS_FETCH: i16 = 5;
const PROGRESS_FILTER: i16 = 25;
const PROGRESS_CHUNK: i16 = 30;
const PROGRESS_EMBED: i16 = 45;
const PROGRESS_WRITE: i16 = 80;

/// Errors from a single ingestion run
#[derive(Debug, Error)]
pub enum IndexRunError {
    #[error("bad repository id: {0}")]
    BadRepo(String),

    #[error(transparent)]
    Ingest(#[from] repomind_ingest::IngestError),

    #[error(transparent)]
    Parsing(#[from] repomind_parsing::ParsingError),

    #[error(transparent)]
    Embedding(#[from] repomind_embeddings::EmbeddingError),

    #[error(transparent)]
    VectorData(#[from] repomind_vector_data::VectorDataError),

    #[error(transparent)]
    Meta(#[from] repomind_meta_data::MetaError),

    #[error("cancelled")]
    Cancelled,
}

impl ErrorClass for IndexRunError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRepo(_) => ErrorKind::BadInput,
            Self::Ingest(e) => e.kind(),
            Self::Parsing(e) => e.kind(),
            Self::Embedding(e) => e.kind(),
            Self::VectorData(e) => e.kind(),
            Self::Meta(e) => e.kind(),
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Executes ingestion jobs against injected services
pub struct IndexRunner {
    fetcher: Arc<GithubFetcher>,
    chunker: Arc<Chunker>,
    embedder: Arc<ChunkEmbedder>,
    store: Arc<dyn VectorStore>,
    meta: Arc<dyn MetaRepository>,
}

impl IndexRunner {
    pub fn new(
        fetcher: Arc<GithubFetcher>,
        chunker: Arc<Chunker>,
        embedder: Arc<ChunkEmbedder>,
        store: Arc<dyn VectorStore>,
        meta: Arc<dyn MetaRepository>,
    ) -> Self {
        Self {
            fetcher,
            chunker,
            embedder,
            store,
            meta,
        }
    }

    /// Run one claimed job to completion
    ///
    /// # Errors
    ///
    /// Any stage failure; the caller records it on the job. `Cancelled`
    /// when the token fires between stages.
    #[tracing::instrument(skip(self, job, cancel), fields(job_id = %job.job_id, repo_id = %job.repo_id))]
    pub async fn run_job(
        &self,
        job: &IndexJob,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome, IndexRunError> {
        let correlation_id = CorrelationId::from(job.correlation_id);
        let repo = RepoId::parse(&job.repo_id)
            .map_err(|e| IndexRunError::BadRepo(e.to_string()))?;
        let repo_key = repo.as_key();

        // A ready snapshot keeps serving (and keeps its status) while a
        // refresh runs; the writer owns the ready transition and its
        // commit-hash dedup check reads the prior status
        let record = self.meta.ensure_repo(&repo_key).await?;
        if record.status != IndexStatus::Ready {
            self.meta
                .set_repo_status(&repo_key, IndexStatus::Indexing)
                .await?;
        }

        // Fetch
        self.progress(job, PROGRESS_FETCH, "fetch").await?;
        let snapshot = self.fetcher.fetch(&repo, &correlation_id).await?;
        self.checkpoint(cancel)?;

        // Filter
        self.progress(job, PROGRESS_FILTER, "filter").await?;
        let total_files = snapshot.files.len();
        let outcome = repomind_ingest::partition(snapshot.files);
        tracing::info!(
            total_files,
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "filter complete"
        );
        self.checkpoint(cancel)?;

        // Chunk
        self.progress(job, PROGRESS_CHUNK, "chunk").await?;
        let mut chunks: Vec<Chunk> = Vec::new();
        for file in &outcome.accepted {
            let set = self.chunker.chunk_file(&repo_key, &file.path, &file.content)?;
            chunks.extend(set.chunks);
        }
        tracing::info!(chunk_count = chunks.len(), "chunking complete");
        self.checkpoint(cancel)?;

        // Embed
        self.progress(job, PROGRESS_EMBED, "embed").await?;
        let run = self.embedder.embed_chunks(chunks, &correlation_id).await?;
        self.checkpoint(cancel)?;

        // Write
        self.progress(job, PROGRESS_WRITE, "write").await?;
        let write = self
            .store
            .write(
                &run.embedded,
                &WriteContext {
                    repo_id: repo_key,
                    commit_hash: snapshot.commit_hash,
                    default_branch: snapshot.default_branch,
                    model: run.model,
                },
                &correlation_id,
            )
            .await?;

        Ok(write)
    }

    /// Record a job failure, leaving the previous ready snapshot alone
    pub async fn record_failure(&self, job: &IndexJob, error: &IndexRunError) {
        if let Err(e) = self.meta.fail_job(&job.job_id, &error.to_string()).await {
            tracing::error!(job_id = %job.job_id, error = %e, "could not record job failure");
        }
        if let Err(e) = self
            .meta
            .set_repo_status(&job.repo_id, IndexStatus::Failed)
            .await
        {
            tracing::error!(repo_id = %job.repo_id, error = %e, "could not mark repo failed");
        }
    }

    async fn progress(&self, job: &IndexJob, percent: i16, stage: &str) -> Result<(), IndexRunError> {
        self.meta
            .update_job_progress(&job.job_id, percent, stage)
            .await?;
        Ok(())
    }

    fn checkpoint(&self, cancel: &CancellationToken) -> Result<(), IndexRunError> {
        if cancel.is_cancelled() {
            return Err(IndexRunError::Cancelled);
        }
        Ok(())
    }
}
