//! Indexing endpoints
//!
//! `POST /index` enqueues an ingestion (idempotent per repository);
//! `GET /index/status/{job_id}` reports queue state and progress.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use repomind_common::{CorrelationId, RepoId};
use repomind_meta_data::JobState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/index", post(enqueue_handler))
        .route("/index/status/{job_id}", get(status_handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexRequest {
    github_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexResponse {
    job_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    state: JobState,
    progress: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JobResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks_written: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    write_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn enqueue_handler(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<IndexResponse>, ApiError> {
    let repo = RepoId::parse(&request.github_url)
        .map_err(|e| ApiError::bad_input(e.to_string()))?;
    let repo_key = repo.as_key();
    let correlation_id = CorrelationId::new();

    state.meta.ensure_repo(&repo_key).await?;
    let job = state
        .meta
        .enqueue_job(&repo_key, &request.github_url, &correlation_id)
        .await?;

    tracing::info!(
        correlation_id = %correlation_id,
        repo_id = %repo_key,
        job_id = %job.job_id,
        "index job enqueued"
    );
    Ok(Json(IndexResponse { job_id: job.job_id }))
}

async fn status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let job = state
        .meta
        .get_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no job {job_id}")))?;

    let result = match job.state {
        JobState::Completed => Some(JobResult {
            chunks_written: job.chunks_written,
            write_strategy: job.write_strategy,
            error: None,
        }),
        JobState::Failed => Some(JobResult {
            chunks_written: None,
            write_strategy: None,
            error: job.error_message,
        }),
        JobState::Waiting | JobState::Active => None,
    };

    Ok(Json(StatusResponse {
        state: job.state,
        progress: job.progress,
        stage: job.stage,
        result,
    }))
}
