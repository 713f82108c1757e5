//! Query-time retriever
//!
//! Steps: embed the query (`RETRIEVAL_QUERY`), cosine search scoped to
//! the repository with an over-fetch factor, rerank by file proximity,
//! truncate to top-K. Refuses to serve an index built by a different
//! embedding model; mixing spaces silently ruins recall.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;
use repomind_common::CorrelationId;
use repomind_config::RetrievalConfig;
use repomind_embeddings::ChunkEmbedder;
use repomind_vector_data::{ScoredChunk, SearchQuery, VectorStore};

use crate::error::{SearchError, SearchResult};
use crate::rerank::{RetrievedChunk, rerank_by_file_proximity};

const CACHE_ENTRIES: usize = 100;

/// Per-call knobs, defaulted from [`RetrievalConfig`]
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub top_k: usize,
    pub candidate_multiplier: usize,
    pub min_score: f32,
    /// Optional SQL-LIKE pattern restricting file paths
    pub file_filter: Option<String>,
}

impl RetrieveOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            candidate_multiplier: config.candidate_multiplier,
            min_score: config.min_score,
            file_filter: None,
        }
    }

    /// Override the result size, keeping the other defaults
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

/// Result of one retrieval
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Top-K chunks, score descending
    pub chunks: Vec<RetrievedChunk>,
    /// Candidates seen before truncation
    pub total_candidates: usize,
    pub duration: Duration,
}

type QueryCache = Mutex<LruCache<String, Vec<RetrievedChunk>>>;

/// Retriever over an embedder and a vector store
pub struct Retriever {
    embedder: Arc<ChunkEmbedder>,
    store: Arc<dyn VectorStore>,
    defaults: RetrievalConfig,
    cache: QueryCache,
}

impl Retriever {
    pub fn new(
        embedder: Arc<ChunkEmbedder>,
        store: Arc<dyn VectorStore>,
        defaults: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            defaults,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Defaults for this deployment
    pub fn options(&self) -> RetrieveOptions {
        RetrieveOptions::from_config(&self.defaults)
    }

    /// Embed the query text (query-side task type)
    ///
    /// # Errors
    ///
    /// `BadQuery` for empty input, embedding failures otherwise.
    pub async fn embed_query(&self, query: &str) -> SearchResult<Vec<f32>> {
        if query.trim().is_empty() {
            return Err(SearchError::BadQuery("query must not be empty".to_string()));
        }
        Ok(self.embedder.embed_query(query).await?)
    }

    /// Cosine-search candidates, guarded against model-space mixing
    ///
    /// # Errors
    ///
    /// `NotIndexed` when the repository has no servable index,
    /// `SchemaMismatch` when the stored model differs from ours.
    pub async fn search_candidates(
        &self,
        repo_id: &str,
        query_embedding: Vec<f32>,
        options: &RetrieveOptions,
        correlation_id: &CorrelationId,
    ) -> SearchResult<Vec<ScoredChunk>> {
        let record = self
            .store
            .get_index(repo_id)
            .await?
            .ok_or_else(|| SearchError::NotIndexed(repo_id.to_string()))?;

        let Some(stored_model) = record.embedding_model else {
            return Err(SearchError::NotIndexed(repo_id.to_string()));
        };
        if stored_model != self.embedder.model_name() {
            return Err(SearchError::SchemaMismatch {
                stored: stored_model,
                requested: self.embedder.model_name().to_string(),
            });
        }

        let limit = options.top_k.max(1).saturating_mul(options.candidate_multiplier.max(1));
        Ok(self
            .store
            .search(
                &SearchQuery {
                    repo_id: repo_id.to_string(),
                    embedding: query_embedding,
                    limit,
                    min_score: options.min_score,
                    file_filter: options.file_filter.clone(),
                },
                correlation_id,
            )
            .await?)
    }

    /// Full retrieval: embed, search, rerank, truncate
    ///
    /// # Errors
    ///
    /// See [`Self::embed_query`] and [`Self::search_candidates`].
    #[tracing::instrument(skip(self, query), fields(repo_id, correlation_id = %correlation_id, cached = false))]
    pub async fn retrieve(
        &self,
        repo_id: &str,
        query: &str,
        options: &RetrieveOptions,
        correlation_id: &CorrelationId,
    ) -> SearchResult<Retrieval> {
        let started = Instant::now();

        let cache_key = format!(
            "{repo_id}\u{1}{query}\u{1}{}\u{1}{}\u{1}{}",
            options.top_k, options.candidate_multiplier, options.min_score
        );
        if let Ok(mut cache) = self.cache.lock()
            && let Some(hit) = cache.get(&cache_key)
        {
            tracing::Span::current().record("cached", true);
            return Ok(Retrieval {
                chunks: hit.clone(),
                total_candidates: hit.len(),
                duration: started.elapsed(),
            });
        }

        let embedding = self.embed_query(query).await?;
        let candidates = self
            .search_candidates(repo_id, embedding, options, correlation_id)
            .await?;
        let total_candidates = candidates.len();

        let mut chunks = rerank_by_file_proximity(candidates);
        chunks.truncate(options.top_k.max(1));

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(cache_key, chunks.clone());
        }

        tracing::debug!(
            total_candidates,
            returned = chunks.len(),
            "retrieval complete"
        );
        Ok(Retrieval {
            chunks,
            total_candidates,
            duration: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use repomind_config::EmbeddingConfig;
    use repomind_embeddings::{EmbeddingProvider, EmbeddingResult, EmbeddingTask};
    use repomind_parsing::Chunk;
    use repomind_vector_data::{MockVectorStore, WriteContext};
    use uuid::Uuid;

    /// Query-side provider with a fixed direction
    struct FixedQueryProvider;

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
            "fixed-test-model"
        }
    }

    fn chunk(path: &str, index: usize, embedding: Vec<f32>) -> Chunk {
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

    async fn seeded_retriever(chunks: Vec<Chunk>) -> Retriever {
        let store = Arc::new(MockVectorStore::new("fixed-test-model", 3));
        store
            .write(
                &chunks,
                &WriteContext {
                    repo_id: "acme/web".to_string(),
                    commit_hash: "c1".to_string(),
                    default_branch: "main".to_string(),
                    model: "fixed-test-model".to_string(),
                },
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        let embedder = Arc::new(ChunkEmbedder::with_provider(
            Arc::new(FixedQueryProvider),
            &EmbeddingConfig {
                batch_pause_ms: 0,
                ..EmbeddingConfig::default()
            },
        ));
        Retriever::new(embedder, store, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn results_are_sorted_capped_and_above_min_score() {
        // 12 candidates in one direction cluster, a few orthogonal
        let mut chunks = Vec::new();
        for i in 0..10 {
            let lean = 1.0 - (i as f32) * 0.05;
            chunks.push(chunk(
                &format!("src/f{i}.ts"),
                0,
                vec![lean, (1.0 - lean * lean).max(0.0).sqrt(), 0.0],
            ));
        }
        chunks.push(chunk("src/noise1.ts", 0, vec![0.0, 1.0, 0.0]));
        chunks.push(chunk("src/noise2.ts", 0, vec![0.0, 0.0, 1.0]));

        let retriever = seeded_retriever(chunks).await;
        let options = retriever.options();
        let result = retriever
            .retrieve("acme/web", "how does auth work", &options, &CorrelationId::new())
            .await
            .unwrap();

        assert!(result.chunks.len() <= options.top_k);
        assert!(result.chunks.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(result.chunks.iter().all(|c| c.vector_score >= options.min_score));
    }

    #[tokio::test]
    async fn colocated_chunks_surface_with_bounded_boost() {
        let chunks = vec![
            chunk("middleware.ts", 0, vec![1.0, 0.0, 0.0]),
            chunk("middleware.ts", 1, vec![0.9, 0.43, 0.0]),
            chunk("router.ts", 0, vec![0.95, 0.31, 0.0]),
            chunk("handler.ts", 0, vec![0.92, 0.39, 0.0]),
        ];
        let retriever = seeded_retriever(chunks).await;
        let result = retriever
            .retrieve(
                "acme/web",
                "How does the system handle middleware?",
                &retriever.options(),
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        let boosted_in_file = result
            .chunks
            .iter()
            .filter(|c| c.chunk.file_path == "middleware.ts" && c.proximity_boost > 0.0)
            .count();
        assert!(boosted_in_file >= 1);

        let total: f32 = result
            .chunks
            .iter()
            .filter(|c| c.chunk.file_path == "middleware.ts")
            .map(|c| c.proximity_boost)
            .sum();
        assert!(total <= 0.16 + f32::EPSILON);
    }

    #[tokio::test]
    async fn unindexed_repository_is_refused() {
        let retriever = seeded_retriever(vec![chunk("a.ts", 0, vec![1.0, 0.0, 0.0])]).await;
        let err = retriever
            .retrieve("other/repo", "anything", &retriever.options(), &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NotIndexed(_)));
    }

    #[tokio::test]
    async fn model_mismatch_is_fatal_on_the_read_path() {
        let store = Arc::new(MockVectorStore::new("other-model", 3));
        store
            .write(
                &[chunk("a.ts", 0, vec![1.0, 0.0, 0.0])],
                &WriteContext {
                    repo_id: "acme/web".to_string(),
                    commit_hash: "c1".to_string(),
                    default_branch: "main".to_string(),
                    model: "other-model".to_string(),
                },
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        let embedder = Arc::new(ChunkEmbedder::with_provider(
            Arc::new(FixedQueryProvider),
            &EmbeddingConfig::default(),
        ));
        let retriever = Retriever::new(embedder, store, RetrievalConfig::default());

        let err = retriever
            .retrieve("acme/web", "anything", &retriever.options(), &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn empty_query_is_bad_input() {
        let retriever = seeded_retriever(vec![]).await;
        let err = retriever
            .retrieve("acme/web", "   ", &retriever.options(), &CorrelationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::BadQuery(_)));
    }

    #[tokio::test]
    async fn zero_candidates_above_min_score_returns_empty() {
        let retriever =
            seeded_retriever(vec![chunk("a.ts", 0, vec![0.0, 1.0, 0.0])]).await;
        let result = retriever
            .retrieve("acme/web", "unrelated question", &retriever.options(), &CorrelationId::new())
            .await
            .unwrap();
        assert!(result.chunks.is_empty());
        assert_eq!(result.total_candidates, 0);
    }
}
