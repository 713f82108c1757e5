//! Background worker pool
//!
//! A fixed number of workers drain the indexing job queue. Each worker
//! claims one job at a time (`FOR UPDATE SKIP LOCKED` underneath), runs
//! it through [`IndexRunner`], and records the outcome. Shutdown is
//! cooperative: workers finish their current job and exit.

use std::sync::Arc;
use std::time::Duration;

use repomind_config::IndexingConfig;
use repomind_meta_data::MetaRepository;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::indexer::IndexRunner;

/// Worker pool over the job queue
pub struct WorkerPool {
    runner: Arc<IndexRunner>,
    meta: Arc<dyn MetaRepository>,
    concurrency: usize,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(
        runner: Arc<IndexRunner>,
        meta: Arc<dyn MetaRepository>,
        config: &IndexingConfig,
    ) -> Self {
        Self {
            runner,
            meta,
            concurrency: config.worker_concurrency.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops every worker when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run all workers until shutdown
    pub async fn run(&self) {
        info!(workers = self.concurrency, "background indexing workers started");

        let mut join_set = JoinSet::new();
        for worker_id in 0..self.concurrency {
            let runner = Arc::clone(&self.runner);
            let meta = Arc::clone(&self.meta);
            let shutdown = self.shutdown.clone();
            let poll_interval = self.poll_interval;

            join_set.spawn(async move {
                worker_loop(worker_id, runner, meta, shutdown, poll_interval).await;
            });
        }

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "worker task panicked");
            }
        }
        info!("background indexing workers stopped");
    }

    /// Claim and run at most one job (integration tests)
    pub async fn process_one(&self) -> bool {
        match self.meta.claim_next_job().await {
            Ok(Some(job)) => {
                run_claimed_job(&self.runner, &self.meta, &job, &self.shutdown).await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                error!(error = %e, "queue claim failed");
                false
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    runner: Arc<IndexRunner>,
    meta: Arc<dyn MetaRepository>,
    shutdown: CancellationToken,
    poll_interval: Duration,
) {
    tracing::debug!(worker_id, "worker starting");

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match meta.claim_next_job().await {
            Ok(Some(job)) => {
                info!(worker_id, job_id = %job.job_id, repo_id = %job.repo_id, "job claimed");
                run_claimed_job(&runner, &meta, &job, &shutdown).await;
            }
            Ok(None) => {
                // Queue empty: idle until the next poll or shutdown
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(e) => {
                error!(worker_id, error = %e, "queue claim failed");
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(poll_interval * 5) => {}
                }
            }
        }
    }

    tracing::debug!(worker_id, "worker shutting down");
}

async fn run_claimed_job(
    runner: &Arc<IndexRunner>,
    meta: &Arc<dyn MetaRepository>,
    job: &repomind_meta_data::IndexJob,
    shutdown: &CancellationToken,
) {
    match runner.run_job(job, shutdown).await {
        Ok(write) => {
            info!(
                job_id = %job.job_id,
                strategy = %write.strategy,
                chunks_written = write.chunks_written,
                "job completed"
            );
            if let Err(e) = meta
                .complete_job(
                    &job.job_id,
                    write.chunks_written as i64,
                    write.strategy.as_str(),
                )
                .await
            {
                error!(job_id = %job.job_id, error = %e, "could not record job completion");
            }
        }
        Err(run_error) => {
            error!(job_id = %job.job_id, error = %run_error, "job failed");
            runner.record_failure(job, &run_error).await;
        }
    }
}
