//! Batched chunk embedder
//!
//! Drives an [`EmbeddingProvider`] over a chunk list: sequential batches
//! with an inter-batch pause, per-batch retries with backoff, and an
//! all-or-nothing outcome so a partially embedded commit can never reach
//! the store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use repomind_common::CorrelationId;
use repomind_config::EmbeddingConfig;
use repomind_parsing::Chunk;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::local::LocalHashEmbedder;
use crate::remote::RemoteEmbeddingClient;
use crate::traits::{EmbeddingProvider, EmbeddingTask};

const RETRY_BASE_DELAY_MS: u64 = 500;

/// The embed text for a chunk: a grounding header plus the content
///
/// The header carries the file path, symbol name, and language so the
/// vector encodes where the code lives, not just what it says. Index-time
/// and any re-embedding for evaluation must build the identical text.
pub fn embed_text(chunk: &Chunk) -> String {
    let mut header = chunk.file_path.clone();
    if let Some(symbol) = &chunk.symbol_name {
        header.push_str(" · ");
        header.push_str(symbol);
    }
    if let Some(language) = &chunk.language {
        header.push_str(" · ");
        header.push_str(language);
    }
    format!("{header}\n{}", chunk.content)
}

/// Outcome of one embedding run
#[derive(Debug)]
pub struct EmbeddingRun {
    /// Input chunks, same order, each with its vector attached
    pub embedded: Vec<Chunk>,
    /// Model that produced the vectors
    pub model: String,
    /// Rough input size: ceil(chars / 4) summed over embed texts
    pub tokens_used_estimate: usize,
    pub duration: Duration,
}

/// Batching embedder over a pluggable provider
pub struct ChunkEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    batch_pause: Duration,
    max_retries: u32,
}

impl ChunkEmbedder {
    /// Pick the provider from configuration: remote when credentials are
    /// present, the local development fallback otherwise
    ///
    /// # Errors
    ///
    /// Returns an error when the remote client cannot be constructed.
    pub fn from_config(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let provider: Arc<dyn EmbeddingProvider> = if config.has_remote() {
            Arc::new(RemoteEmbeddingClient::new(config)?)
        } else {
            let (model, dimension) = EmbeddingConfig::local_fallback();
            tracing::warn!(
                model = %model,
                "EMBEDDING_API_KEY not set; using the local development embedder"
            );
            Arc::new(LocalHashEmbedder::new(model, dimension))
        };
        Ok(Self::with_provider(provider, config))
    }

    /// Embedder over an explicit provider (tests, alternative backends)
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self {
            provider,
            batch_size: config.batch_size.clamp(1, 100),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            max_retries: config.max_retries,
        }
    }

    /// Model identifier recorded alongside stored vectors
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Width of the vectors this embedder produces
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed every chunk, preserving order
    ///
    /// # Errors
    ///
    /// A batch that still fails after retries aborts the whole run and
    /// discards all partial embeddings: an index is either complete for
    /// a commit or absent.
    #[tracing::instrument(skip(self, chunks), fields(chunk_count = chunks.len(), correlation_id = %correlation_id))]
    pub async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
        correlation_id: &CorrelationId,
    ) -> EmbeddingResult<EmbeddingRun> {
        let started = Instant::now();
        let texts: Vec<String> = chunks.iter().map(embed_text).collect();
        let tokens_used_estimate = texts.iter().map(|t| t.len().div_ceil(4)).sum();

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        let mut first_batch = true;
        for batch in texts.chunks(self.batch_size) {
            if !first_batch {
                // Sequential dispatch with a pause keeps us under
                // upstream rate limits
                tokio::time::sleep(self.batch_pause).await;
            }
            first_batch = false;

            let embedded = self
                .embed_with_retry(batch, EmbeddingTask::RetrievalDocument)
                .await?;
            vectors.extend(embedded);
        }

        let embedded = chunks
            .into_iter()
            .zip(vectors)
            .map(|(mut chunk, vector)| {
                chunk.embedding = Some(vector);
                chunk
            })
            .collect();

        Ok(EmbeddingRun {
            embedded,
            model: self.provider.model_name().to_string(),
            tokens_used_estimate,
            duration: started.elapsed(),
        })
    }

    /// Embed a search query
    ///
    /// # Errors
    ///
    /// Propagates provider failures after retries.
    pub async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let vectors = self
            .embed_with_retry(&[query.to_string()], EmbeddingTask::RetrievalQuery)
            .await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Decode("provider returned no vector".to_string()))
    }

    async fn embed_with_retry(
        &self,
        batch: &[String],
        task: EmbeddingTask,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            match self.provider.embed_batch(batch, task).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "embedding batch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff with clock-derived jitter
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE_DELAY_MS.saturating_mul(1 << attempt.min(6));
    let jitter = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_millis()) % 250)
        .unwrap_or(0);
    Duration::from_millis(base.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn chunk(path: &str, symbol: Option<&str>, content: &str, index: usize) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            repo_id: "acme/web".to_string(),
            file_path: path.to_string(),
            language: Some("rust".to_string()),
            symbol_name: symbol.map(str::to_string),
            start_line: 1,
            end_line: 1,
            content: content.to_string(),
            chunk_index: index,
            embedding: None,
        }
    }

    /// Provider that counts calls and can fail the first N attempts
    struct FlakyProvider {
        calls: AtomicUsize,
        fail_first: usize,
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed_batch(
            &self,
            texts: &[String],
            _task: EmbeddingTask,
        ) -> EmbeddingResult<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(EmbeddingError::Upstream("transient".to_string()));
            }
            Ok(texts.iter().map(|_| vec![0.25; self.dimension]).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "flaky-test-model"
        }
    }

    fn embedder_with(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> ChunkEmbedder {
        let config = EmbeddingConfig {
            batch_size,
            batch_pause_ms: 0,
            max_retries: 3,
            ..EmbeddingConfig::default()
        };
        ChunkEmbedder::with_provider(provider, &config)
    }

    #[test]
    fn embed_text_carries_path_symbol_and_language() {
        let c = chunk("src/auth.rs", Some("login"), "fn login() {}", 0);
        let text = embed_text(&c);
        assert!(text.starts_with("src/auth.rs · login · rust\n"));
        assert!(text.ends_with("fn login() {}"));

        let plain = chunk("README.md", None, "# intro", 0);
        let text = embed_text(&plain);
        assert!(text.starts_with("README.md"));
        assert!(!text.contains(" ·  · "));
    }

    #[tokio::test]
    async fn preserves_chunk_order_across_batches() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            dimension: 4,
        });
        let embedder = embedder_with(provider, 2);

        let chunks: Vec<Chunk> = (0..5)
            .map(|i| chunk(&format!("src/f{i}.rs"), None, "x", i))
            .collect();
        let run = embedder
            .embed_chunks(chunks, &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(run.embedded.len(), 5);
        for (i, c) in run.embedded.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.embedding.as_ref().unwrap().len(), 4);
        }
        assert_eq!(run.model, "flaky-test-model");
        assert!(run.tokens_used_estimate > 0);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_first: 2,
            dimension: 4,
        });
        let embedder = embedder_with(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>, 10);

        let run = embedder
            .embed_chunks(vec![chunk("src/a.rs", None, "x", 0)], &CorrelationId::new())
            .await
            .unwrap();
        assert_eq!(run.embedded.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_abort_the_whole_run() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            dimension: 4,
        });
        let embedder = embedder_with(provider, 1);

        let chunks = vec![
            chunk("src/a.rs", None, "x", 0),
            chunk("src/b.rs", None, "y", 1),
        ];
        let err = embedder
            .embed_chunks(chunks, &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Upstream(_)));
    }
}
