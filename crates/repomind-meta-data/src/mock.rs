//! In-memory [`MetaRepository`] for tests
//!
//! Mirrors the Postgres semantics that matter to callers: repo-key
//! idempotence on enqueue and FIFO waiting-to-active claims.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use repomind_common::CorrelationId;
use uuid::Uuid;

use crate::error::{MetaError, MetaResult};
use crate::models::{IndexJob, IndexStatus, JobState, RepoIndexRecord};
use crate::traits::MetaRepository;

#[derive(Default)]
struct MockState {
    repos: HashMap<String, RepoIndexRecord>,
    jobs: HashMap<Uuid, IndexJob>,
}

/// Mutex-guarded in-memory repository
#[derive(Default)]
pub struct MockMetaRepository {
    state: Mutex<MockState>,
}

impl MockMetaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MetaResult<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| MetaError::Database("mock mutex poisoned".to_string()))
    }

    /// Seed a repo record directly (test setup)
    pub fn insert_repo(&self, record: RepoIndexRecord) {
        if let Ok(mut state) = self.state.lock() {
            state.repos.insert(record.repo_id.clone(), record);
        }
    }
}

fn fresh_repo(repo_id: &str) -> RepoIndexRecord {
    let now = Utc::now();
    RepoIndexRecord {
        repo_id: repo_id.to_string(),
        status: IndexStatus::Pending,
        commit_hash: None,
        default_branch: None,
        embedding_model: None,
        chunk_count: 0,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl MetaRepository for MockMetaRepository {
    async fn get_repo(&self, repo_id: &str) -> MetaResult<Option<RepoIndexRecord>> {
        Ok(self.lock()?.repos.get(repo_id).cloned())
    }

    async fn ensure_repo(&self, repo_id: &str) -> MetaResult<RepoIndexRecord> {
        let mut state = self.lock()?;
        let record = state
            .repos
            .entry(repo_id.to_string())
            .or_insert_with(|| fresh_repo(repo_id));
        Ok(record.clone())
    }

    async fn set_repo_status(&self, repo_id: &str, status: IndexStatus) -> MetaResult<()> {
        let mut state = self.lock()?;
        if let Some(record) = state.repos.get_mut(repo_id) {
            record.status = status;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn enqueue_job(
        &self,
        repo_id: &str,
        github_url: &str,
        correlation_id: &CorrelationId,
    ) -> MetaResult<IndexJob> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .jobs
            .values()
            .find(|j| j.repo_id == repo_id && j.state.is_unfinished())
        {
            return Ok(existing.clone());
        }

        let job = IndexJob {
            job_id: Uuid::new_v4(),
            repo_id: repo_id.to_string(),
            github_url: github_url.to_string(),
            state: JobState::Waiting,
            progress: 0,
            stage: None,
            error_message: None,
            chunks_written: None,
            write_strategy: None,
            correlation_id: correlation_id.to_uuid(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        state.jobs.insert(job.job_id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: &Uuid) -> MetaResult<Option<IndexJob>> {
        Ok(self.lock()?.jobs.get(job_id).cloned())
    }

    async fn claim_next_job(&self) -> MetaResult<Option<IndexJob>> {
        let mut state = self.lock()?;
        let next_id = state
            .jobs
            .values()
            .filter(|j| j.state == JobState::Waiting)
            .min_by_key(|j| j.created_at)
            .map(|j| j.job_id);

        let Some(job_id) = next_id else {
            return Ok(None);
        };
        let Some(job) = state.jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        job.state = JobState::Active;
        job.started_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    async fn update_job_progress(
        &self,
        job_id: &Uuid,
        progress: i16,
        stage: &str,
    ) -> MetaResult<()> {
        let mut state = self.lock()?;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.progress = progress.clamp(0, 100);
            job.stage = Some(stage.to_string());
        }
        Ok(())
    }

    async fn complete_job(
        &self,
        job_id: &Uuid,
        chunks_written: i64,
        write_strategy: &str,
    ) -> MetaResult<()> {
        let mut state = self.lock()?;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.state = JobState::Completed;
            job.progress = 100;
            job.chunks_written = Some(chunks_written);
            job.write_strategy = Some(write_strategy.to_string());
            job.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail_job(&self, job_id: &Uuid, error: &str) -> MetaResult<()> {
        let mut state = self.lock()?;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.state = JobState::Failed;
            job.error_message = Some(error.to_string());
            job.finished_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_is_idempotent_per_repo_key() {
        let repo = MockMetaRepository::new();
        let cid = CorrelationId::new();

        let first = repo
            .enqueue_job("acme/web", "https://github.com/acme/web", &cid)
            .await
            .unwrap();
        let second = repo
            .enqueue_job("acme/web", "https://github.com/acme/web", &cid)
            .await
            .unwrap();
        assert_eq!(first.job_id, second.job_id);

        // A different repo gets its own job
        let other = repo
            .enqueue_job("acme/api", "https://github.com/acme/api", &cid)
            .await
            .unwrap();
        assert_ne!(first.job_id, other.job_id);
    }

    #[tokio::test]
    async fn finished_jobs_release_the_repo_key() {
        let repo = MockMetaRepository::new();
        let cid = CorrelationId::new();

        let first = repo
            .enqueue_job("acme/web", "https://github.com/acme/web", &cid)
            .await
            .unwrap();
        repo.complete_job(&first.job_id, 12, "upsert").await.unwrap();

        let second = repo
            .enqueue_job("acme/web", "https://github.com/acme/web", &cid)
            .await
            .unwrap();
        assert_ne!(first.job_id, second.job_id);
    }

    #[tokio::test]
    async fn claims_are_fifo_and_single_delivery() {
        let repo = MockMetaRepository::new();
        let cid = CorrelationId::new();

        let a = repo.enqueue_job("acme/a", "u", &cid).await.unwrap();
        let b = repo.enqueue_job("acme/b", "u", &cid).await.unwrap();

        let first = repo.claim_next_job().await.unwrap().unwrap();
        assert_eq!(first.job_id, a.job_id);
        assert_eq!(first.state, JobState::Active);

        let second = repo.claim_next_job().await.unwrap().unwrap();
        assert_eq!(second.job_id, b.job_id);

        assert!(repo.claim_next_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn progress_and_failure_are_recorded() {
        let repo = MockMetaRepository::new();
        let cid = CorrelationId::new();
        let job = repo.enqueue_job("acme/web", "u", &cid).await.unwrap();

        repo.update_job_progress(&job.job_id, 45, "chunk").await.unwrap();
        let loaded = repo.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.progress, 45);
        assert_eq!(loaded.stage.as_deref(), Some("chunk"));

        repo.fail_job(&job.job_id, "upstream went away").await.unwrap();
        let failed = repo.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(failed.state, JobState::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("upstream went away"));
    }
}
