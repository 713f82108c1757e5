//! Metadata repository trait for dependency injection and testing

use async_trait::async_trait;
use repomind_common::CorrelationId;
use uuid::Uuid;

use crate::error::MetaResult;
use crate::models::{IndexJob, IndexStatus, RepoIndexRecord};

/// All metadata operations: repo index records and the job queue
#[async_trait]
pub trait MetaRepository: Send + Sync {
    /// Read one repository's index record
    async fn get_repo(&self, repo_id: &str) -> MetaResult<Option<RepoIndexRecord>>;

    /// Create the record on first contact, or return the existing one
    async fn ensure_repo(&self, repo_id: &str) -> MetaResult<RepoIndexRecord>;

    /// Move a repository's index status (job runner bookkeeping; the
    /// writer transaction owns the ready transition)
    async fn set_repo_status(&self, repo_id: &str, status: IndexStatus) -> MetaResult<()>;

    /// Enqueue an ingestion, idempotent on the repo key
    ///
    /// A repository with an unfinished job returns that job unchanged
    /// instead of creating a second one.
    async fn enqueue_job(
        &self,
        repo_id: &str,
        github_url: &str,
        correlation_id: &CorrelationId,
    ) -> MetaResult<IndexJob>;

    /// Read one job
    async fn get_job(&self, job_id: &Uuid) -> MetaResult<Option<IndexJob>>;

    /// Claim the oldest waiting job (`FOR UPDATE SKIP LOCKED`), marking
    /// it active; `None` when the queue is empty
    async fn claim_next_job(&self) -> MetaResult<Option<IndexJob>>;

    /// Record stage progress for a running job
    async fn update_job_progress(&self, job_id: &Uuid, progress: i16, stage: &str)
    -> MetaResult<()>;

    /// Mark a job completed with its write outcome
    async fn complete_job(
        &self,
        job_id: &Uuid,
        chunks_written: i64,
        write_strategy: &str,
    ) -> MetaResult<()>;

    /// Mark a job failed, keeping the previous index snapshot untouched
    async fn fail_job(&self, job_id: &Uuid, error: &str) -> MetaResult<()>;
}
