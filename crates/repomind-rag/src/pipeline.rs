//! Pipeline stage driver
//!
//! Walks embedding → retrieval → ranking → context → generation, emitting
//! one typed event per completed stage plus a token event per LLM delta.
//! The driver is the single source of event ordering: no stage reports
//! done before its predecessors, the ranked chunk list always precedes
//! the first token, and failure surfaces as exactly one terminal error
//! event.

use std::sync::Arc;
use std::time::Instant;

use repomind_common::{CorrelationId, ErrorClass, ErrorKind};
use repomind_search::{RetrieveOptions, RetrievedChunk, Retriever, rerank_by_file_proximity};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::context::{AssembledContext, Citation, ContextAssembler};
use crate::error::{RagError, RagResult};
use crate::llm::{ChatProvider, ChatRequest};

/// Answer used when retrieval produced nothing above the score floor
const NO_CONTEXT_ANSWER: &str =
    "The repository index produced no relevant excerpts for this question, so I cannot \
     answer it from the code.";

/// The five pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Embedding,
    Retrieval,
    Ranking,
    Context,
    Generation,
}

impl PipelineStage {
    /// SSE event name for this stage
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Embedding => "stage:embedding",
            Self::Retrieval => "stage:retrieval",
            Self::Ranking => "stage:ranking",
            Self::Context => "stage:context",
            Self::Generation => "stage:generation",
        }
    }
}

/// One event on the pipeline stream
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A stage finished; payload is self-describing JSON
    Stage {
        stage: PipelineStage,
        payload: serde_json::Value,
    },
    /// One incremental LLM text delta
    Token { text: String },
    /// Terminal failure; nothing follows
    Error { kind: ErrorKind, message: String },
}

impl PipelineEvent {
    /// SSE event name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stage { stage, .. } => stage.event_name(),
            Self::Token { .. } => "token",
            Self::Error { .. } => "error",
        }
    }

    /// SSE data payload
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Stage { payload, .. } => payload.clone(),
            Self::Token { text } => json!({ "text": text }),
            Self::Error { kind, message } => json!({ "kind": kind, "message": message }),
        }
    }
}

/// Response metadata returned alongside the answer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMeta {
    pub model: String,
    pub total_candidates: usize,
    pub token_estimate: usize,
    pub duration_ms: u64,
}

/// Final result of one pipeline run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub chunks: Vec<RetrievedChunk>,
    pub meta: PipelineMeta,
}

/// Drives the staged RAG flow over injected services
pub struct RagPipeline {
    retriever: Arc<Retriever>,
    assembler: ContextAssembler,
    chat: Arc<dyn ChatProvider>,
}

impl RagPipeline {
    pub fn new(
        retriever: Arc<Retriever>,
        assembler: ContextAssembler,
        chat: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            retriever,
            assembler,
            chat,
        }
    }

    /// Per-deployment retrieval defaults
    pub fn options(&self) -> RetrieveOptions {
        self.retriever.options()
    }

    /// Run the pipeline, emitting events; errors become one terminal
    /// `error` event before propagating
    ///
    /// # Errors
    ///
    /// Retrieval and generation failures, or `Cancelled` when the caller
    /// goes away.
    pub async fn run(
        &self,
        repo_id: &str,
        query: &str,
        options: &RetrieveOptions,
        events: mpsc::Sender<PipelineEvent>,
        cancel: CancellationToken,
        correlation_id: &CorrelationId,
    ) -> RagResult<PipelineOutcome> {
        match self
            .drive(repo_id, query, options, &events, &cancel, correlation_id)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Single terminal error event; send failures mean the
                // caller is already gone
                let _ = events
                    .send(PipelineEvent::Error {
                        kind: e.kind(),
                        message: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Synchronous path: run the pipeline, discarding interim events
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`].
    pub async fn answer(
        &self,
        repo_id: &str,
        query: &str,
        options: &RetrieveOptions,
        cancel: CancellationToken,
        correlation_id: &CorrelationId,
    ) -> RagResult<PipelineOutcome> {
        let (events, mut sink) = mpsc::channel(64);
        let drain = tokio::spawn(async move { while sink.recv().await.is_some() {} });
        let outcome = self
            .run(repo_id, query, options, events, cancel, correlation_id)
            .await;
        drain.abort();
        outcome
    }

    #[tracing::instrument(skip_all, fields(repo_id, correlation_id = %correlation_id))]
    async fn drive(
        &self,
        repo_id: &str,
        query: &str,
        options: &RetrieveOptions,
        events: &mpsc::Sender<PipelineEvent>,
        cancel: &CancellationToken,
        correlation_id: &CorrelationId,
    ) -> RagResult<PipelineOutcome> {
        let run_started = Instant::now();

        // Stage: embedding
        let started = Instant::now();
        let query_embedding = self.retriever.embed_query(query).await?;
        emit_stage(
            events,
            PipelineStage::Embedding,
            json!({
                "status": "done",
                "durationMs": ms(started),
                "dimension": query_embedding.len(),
            }),
        )
        .await?;
        ensure_live(cancel)?;

        // Stage: retrieval
        let started = Instant::now();
        let candidates = self
            .retriever
            .search_candidates(repo_id, query_embedding, options, correlation_id)
            .await?;
        let total_candidates = candidates.len();
        emit_stage(
            events,
            PipelineStage::Retrieval,
            json!({
                "status": "done",
                "durationMs": ms(started),
                "candidateCount": total_candidates,
            }),
        )
        .await?;
        ensure_live(cancel)?;

        // Stage: ranking
        let started = Instant::now();
        let mut ranked = rerank_by_file_proximity(candidates);
        ranked.truncate(options.top_k.max(1));
        emit_stage(
            events,
            PipelineStage::Ranking,
            json!({
                "status": "done",
                "durationMs": ms(started),
                "chunks": ranked.iter().map(ranked_summary).collect::<Vec<_>>(),
            }),
        )
        .await?;
        ensure_live(cancel)?;

        // Stage: context
        let started = Instant::now();
        let assembled = self.assembler.assemble(query, &ranked, repo_id);
        emit_stage(
            events,
            PipelineStage::Context,
            json!({
                "status": "done",
                "durationMs": ms(started),
                "tokenEstimate": assembled.token_estimate,
                "citationCount": assembled.citations.len(),
                "promptChars": assembled.user_prompt.len(),
            }),
        )
        .await?;
        ensure_live(cancel)?;

        // Stage: generation
        let answer = self
            .generate(&assembled, events, cancel)
            .await?;

        Ok(PipelineOutcome {
            answer,
            citations: assembled.citations,
            chunks: ranked,
            meta: PipelineMeta {
                model: self.chat.model_name().to_string(),
                total_candidates,
                token_estimate: assembled.token_estimate,
                duration_ms: ms(run_started),
            },
        })
    }

    async fn generate(
        &self,
        assembled: &AssembledContext,
        events: &mpsc::Sender<PipelineEvent>,
        cancel: &CancellationToken,
    ) -> RagResult<String> {
        let started = Instant::now();

        if !assembled.has_context() {
            let answer = NO_CONTEXT_ANSWER.to_string();
            emit_stage(
                events,
                PipelineStage::Generation,
                json!({ "status": "done", "durationMs": ms(started), "answer": answer }),
            )
            .await?;
            return Ok(answer);
        }

        let request = ChatRequest {
            system_prompt: assembled.system_prompt.clone(),
            user_prompt: assembled.user_prompt.clone(),
        };

        // Forward LLM deltas as token events while the stream runs
        let (token_tx, mut token_rx) = mpsc::channel::<String>(64);
        let forward_to = events.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(text) = token_rx.recv().await {
                if forward_to.send(PipelineEvent::Token { text }).await.is_err() {
                    break;
                }
            }
        });

        let result = self.chat.stream_chat(&request, token_tx, cancel).await;
        // The sender is dropped by stream_chat returning; wait until
        // every token event is on the wire before the terminal stage
        let _ = forwarder.await;
        let answer = result?;

        emit_stage(
            events,
            PipelineStage::Generation,
            json!({ "status": "done", "durationMs": ms(started), "answer": answer }),
        )
        .await?;
        Ok(answer)
    }
}

fn ranked_summary(chunk: &RetrievedChunk) -> serde_json::Value {
    json!({
        "filePath": chunk.chunk.file_path,
        "startLine": chunk.chunk.start_line,
        "endLine": chunk.chunk.end_line,
        "symbolName": chunk.chunk.symbol_name,
        "vectorScore": chunk.vector_score,
        "proximityBoost": chunk.proximity_boost,
        "score": chunk.score,
    })
}

fn ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn ensure_live(cancel: &CancellationToken) -> RagResult<()> {
    if cancel.is_cancelled() {
        return Err(RagError::Cancelled);
    }
    Ok(())
}

async fn emit_stage(
    events: &mpsc::Sender<PipelineEvent>,
    stage: PipelineStage,
    payload: serde_json::Value,
) -> RagResult<()> {
    events
        .send(PipelineEvent::Stage { stage, payload })
        .await
        .map_err(|_| RagError::Cancelled)
}
