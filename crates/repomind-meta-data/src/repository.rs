//! Postgres implementation of [`MetaRepository`]
//!
//! Runtime sqlx queries against the `repo_index` and `index_jobs`
//! tables. Queue claims use `FOR UPDATE SKIP LOCKED` so concurrent
//! workers never receive the same job.

use async_trait::async_trait;
use repomind_common::CorrelationId;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::MetaResult;
use crate::models::{IndexJob, IndexStatus, JobState, RepoIndexRecord};
use crate::traits::MetaRepository;

/// Metadata repository backed by the shared Postgres pool
pub struct PgMetaRepository {
    pool: PgPool,
}

impl PgMetaRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn repo_from_row(row: &PgRow) -> MetaResult<RepoIndexRecord> {
    let status: String = row.try_get("status")?;
    Ok(RepoIndexRecord {
        repo_id: row.try_get("repo_id")?,
        status: status.parse().unwrap_or(IndexStatus::Pending),
        commit_hash: row.try_get("commit_hash")?,
        default_branch: row.try_get("default_branch")?,
        embedding_model: row.try_get("embedding_model")?,
        chunk_count: row.try_get("chunk_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn job_from_row(row: &PgRow) -> MetaResult<IndexJob> {
    let state: String = row.try_get("state")?;
    Ok(IndexJob {
        job_id: row.try_get("job_id")?,
        repo_id: row.try_get("repo_id")?,
        github_url: row.try_get("github_url")?,
        state: state.parse().unwrap_or(JobState::Waiting),
        progress: row.try_get("progress")?,
        stage: row.try_get("stage")?,
        error_message: row.try_get("error_message")?,
        chunks_written: row.try_get("chunks_written")?,
        write_strategy: row.try_get("write_strategy")?,
        correlation_id: row.try_get("correlation_id")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

#[async_trait]
impl MetaRepository for PgMetaRepository {
    async fn get_repo(&self, repo_id: &str) -> MetaResult<Option<RepoIndexRecord>> {
        let row = sqlx::query("SELECT * FROM repo_index WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(repo_from_row).transpose()
    }

    async fn ensure_repo(&self, repo_id: &str) -> MetaResult<RepoIndexRecord> {
        let row = sqlx::query(
            r"
            INSERT INTO repo_index (repo_id)
            VALUES ($1)
            ON CONFLICT (repo_id) DO UPDATE SET repo_id = EXCLUDED.repo_id
            RETURNING *
            ",
        )
        .bind(repo_id)
        .fetch_one(&self.pool)
        .await?;
        repo_from_row(&row)
    }

    async fn set_repo_status(&self, repo_id: &str, status: IndexStatus) -> MetaResult<()> {
        sqlx::query("UPDATE repo_index SET status = $2, updated_at = now() WHERE repo_id = $1")
            .bind(repo_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(repo_id, correlation_id = %correlation_id))]
    async fn enqueue_job(
        &self,
        repo_id: &str,
        github_url: &str,
        correlation_id: &CorrelationId,
    ) -> MetaResult<IndexJob> {
        // Fast path: an unfinished job already owns this repo key
        if let Some(existing) = self.unfinished_job_for(repo_id).await? {
            tracing::debug!(job_id = %existing.job_id, "reusing unfinished job for repo");
            return Ok(existing);
        }

        let insert = sqlx::query(
            r"
            INSERT INTO index_jobs (job_id, repo_id, github_url, correlation_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(repo_id)
        .bind(github_url)
        .bind(correlation_id.to_uuid())
        .fetch_one(&self.pool)
        .await;

        match insert {
            Ok(row) => job_from_row(&row),
            // Lost the race against a concurrent enqueue: the partial
            // unique index rejected us, so the winner's job exists now
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                match self.unfinished_job_for(repo_id).await? {
                    Some(job) => Ok(job),
                    None => Err(crate::MetaError::Database(
                        "unique violation without a surviving job".to_string(),
                    )),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_job(&self, job_id: &Uuid) -> MetaResult<Option<IndexJob>> {
        let row = sqlx::query("SELECT * FROM index_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn claim_next_job(&self) -> MetaResult<Option<IndexJob>> {
        let row = sqlx::query(
            r"
            WITH next AS (
                SELECT job_id FROM index_jobs
                WHERE state = 'waiting'
                ORDER BY created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            UPDATE index_jobs j
            SET state = 'active', started_at = now()
            FROM next
            WHERE j.job_id = next.job_id
            RETURNING j.*
            ",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn update_job_progress(
        &self,
        job_id: &Uuid,
        progress: i16,
        stage: &str,
    ) -> MetaResult<()> {
        sqlx::query("UPDATE index_jobs SET progress = $2, stage = $3 WHERE job_id = $1")
            .bind(job_id)
            .bind(progress.clamp(0, 100))
            .bind(stage)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn complete_job(
        &self,
        job_id: &Uuid,
        chunks_written: i64,
        write_strategy: &str,
    ) -> MetaResult<()> {
        sqlx::query(
            r"
            UPDATE index_jobs
            SET state = 'completed', progress = 100, finished_at = now(),
                chunks_written = $2, write_strategy = $3
            WHERE job_id = $1
            ",
        )
        .bind(job_id)
        .bind(chunks_written)
        .bind(write_strategy)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_job(&self, job_id: &Uuid, error: &str) -> MetaResult<()> {
        sqlx::query(
            r"
            UPDATE index_jobs
            SET state = 'failed', finished_at = now(), error_message = $2
            WHERE job_id = $1
            ",
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl PgMetaRepository {
    async fn unfinished_job_for(&self, repo_id: &str) -> MetaResult<Option<IndexJob>> {
        let row = sqlx::query(
            r"
            SELECT * FROM index_jobs
            WHERE repo_id = $1 AND state IN ('waiting', 'active')
            LIMIT 1
            ",
        )
        .bind(repo_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }
}
