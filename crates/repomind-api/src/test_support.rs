//! Shared fixtures for route tests
//!
//! Builds an [`AppState`] over the in-memory mocks: mock metadata, a
//! seeded mock vector store, a fixed-direction query embedder, and the
//! canned chat provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use repomind_common::CorrelationId;
use repomind_config::{ContextConfig, EmbeddingConfig, RetrievalConfig};
use repomind_embeddings::{ChunkEmbedder, EmbeddingProvider, EmbeddingResult, EmbeddingTask};
use repomind_meta_data::MockMetaRepository;
use repomind_parsing::Chunk;
use repomind_rag::{ContextAssembler, MockChat, RagPipeline};
use repomind_search::Retriever;
use repomind_vector_data::{MockVectorStore, VectorStore, WriteContext};
use uuid::Uuid;

use crate::state::AppState;

pub const TEST_MODEL: &str = "fixed-test-model";

/// Query-side embedding provider with a constant direction
pub struct FixedQueryProvider;

#[async_trait]
impl EmbeddingProvider for FixedQueryProvider {
    async fn embed_batch(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        TEST_MODEL
    }
}

/// A chunk pre-embedded into the 3-dimensional test space
pub fn seeded_chunk(path: &str, index: usize, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: Uuid::new_v4(),
        repo_id: "acme/web".to_string(),
        file_path: path.to_string(),
        language: Some("typescript".to_string()),
        symbol_name: None,
        start_line: index * 10 + 1,
        end_line: index * 10 + 9,
        content: format!("chunk {index} of {path}"),
        chunk_index: index,
        embedding: Some(embedding),
    }
}

/// AppState over mocks, with `acme/web` indexed when chunks are given
pub async fn mock_state(chunks: Vec<Chunk>) -> AppState {
    let store = Arc::new(MockVectorStore::new(TEST_MODEL, 3));
    if !chunks.is_empty() {
        store
            .write(
                &chunks,
                &WriteContext {
                    repo_id: "acme/web".to_string(),
                    commit_hash: "c1".to_string(),
                    default_branch: "main".to_string(),
                    model: TEST_MODEL.to_string(),
                },
                &CorrelationId::new(),
            )
            .await
            .expect("seed write");
    }

    let embedder = Arc::new(ChunkEmbedder::with_provider(
        Arc::new(FixedQueryProvider),
        &EmbeddingConfig {
            batch_pause_ms: 0,
            ..EmbeddingConfig::default()
        },
    ));
    let retriever = Arc::new(Retriever::new(embedder, store, RetrievalConfig::default()));
    let pipeline = Arc::new(RagPipeline::new(
        retriever,
        ContextAssembler::new(ContextConfig::default().char_budget),
        Arc::new(MockChat::new("It is handled in middleware [1].")),
    ));

    AppState::new(Arc::new(MockMetaRepository::new()), pipeline)
}

/// Collect a response body as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Collect a response body as text (SSE streams included)
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8_lossy(&bytes).into_owned()
}
