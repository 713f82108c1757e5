//! Query endpoints
//!
//! `POST /rag/query` waits for the whole answer; `POST /rag/pipeline`
//! streams the staged flow as server-sent events. The SSE stream carries
//! exactly the event names of the pipeline driver and terminates with
//! either the generation stage or a single error event. Dropping the
//! connection cancels the run.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};
use futures_util::Stream;
use repomind_common::CorrelationId;
use repomind_rag::{Citation, PipelineEvent};
use repomind_search::RetrievedChunk;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rag/query", post(query_handler))
        .route("/rag/pipeline", post(pipeline_handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagRequest {
    repo_id: String,
    query: String,
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagResponse {
    answer: String,
    citations: Vec<Citation>,
    chunks: Vec<RetrievedChunk>,
    meta: repomind_rag::PipelineMeta,
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<RagRequest>,
) -> Result<Json<RagResponse>, ApiError> {
    let correlation_id = CorrelationId::new();
    let mut options = state.pipeline.options();
    if let Some(top_k) = request.top_k {
        options = options.with_top_k(top_k);
    }

    let outcome = state
        .pipeline
        .answer(
            &request.repo_id,
            &request.query,
            &options,
            CancellationToken::new(),
            &correlation_id,
        )
        .await?;

    Ok(Json(RagResponse {
        answer: outcome.answer,
        citations: outcome.citations,
        chunks: outcome.chunks,
        meta: outcome.meta,
    }))
}

async fn pipeline_handler(
    State(state): State<AppState>,
    Json(request): Json<RagRequest>,
) -> impl IntoResponse {
    let correlation_id = CorrelationId::new();
    let mut options = state.pipeline.options();
    if let Some(top_k) = request.top_k {
        options = options.with_top_k(top_k);
    }

    let cancel = CancellationToken::new();
    let (events, receiver) = mpsc::channel::<PipelineEvent>(256);

    // The run outlives this handler; its errors already arrive as an
    // `error` event on the stream
    let pipeline = state.pipeline;
    let run_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = pipeline
            .run(
                &request.repo_id,
                &request.query,
                &options,
                events,
                run_cancel,
                &correlation_id,
            )
            .await;
    });

    let headers = [
        ("Cache-Control", "no-cache"),
        ("Connection", "keep-alive"),
    ];
    (headers, Sse::new(event_stream(receiver, cancel)).keep_alive(KeepAlive::default()))
}

/// Adapt the pipeline channel to SSE frames; dropping the stream fires
/// the cancellation token and aborts the run
fn event_stream(
    receiver: mpsc::Receiver<PipelineEvent>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = cancel.drop_guard();
    futures_util::stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        let event = receiver.recv().await?;
        let frame = Event::default()
            .event(event.name())
            .data(event.payload().to_string());
        Some((Ok(frame), (receiver, guard)))
    })
}
