//! In-memory [`VectorStore`] for tests
//!
//! Implements the same writer decision table and real cosine math so the
//! retriever and writer tests exercise true semantics without Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use repomind_common::CorrelationId;
use repomind_meta_data::{IndexStatus, RepoIndexRecord};
use repomind_parsing::Chunk;

use crate::error::{VectorDataError, VectorDataResult};
use crate::traits::{
    ScoredChunk, SearchQuery, VectorStore, WriteContext, WriteOutcome, WriteStrategy,
};

struct StoredRepo {
    record: RepoIndexRecord,
    chunks: Vec<Chunk>,
}

/// Mutex-guarded in-memory store
pub struct MockVectorStore {
    declared_model: String,
    dimension: usize,
    repos: Mutex<HashMap<String, StoredRepo>>,
}

impl MockVectorStore {
    pub fn new(declared_model: &str, dimension: usize) -> Self {
        Self {
            declared_model: declared_model.to_string(),
            dimension,
            repos: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> VectorDataResult<std::sync::MutexGuard<'_, HashMap<String, StoredRepo>>> {
        self.repos
            .lock()
            .map_err(|_| VectorDataError::Storage("mock mutex poisoned".to_string()))
    }

    /// Number of chunks currently stored for a repo (test assertions)
    pub fn chunk_count(&self, repo_id: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|repos| repos.get(repo_id).map(|r| r.chunks.len()))
            .unwrap_or(0)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn write(
        &self,
        chunks: &[Chunk],
        context: &WriteContext,
        _correlation_id: &CorrelationId,
    ) -> VectorDataResult<WriteOutcome> {
        if context.model != self.declared_model {
            return Err(VectorDataError::SchemaMismatch(format!(
                "store is declared for '{}', write carries '{}'",
                self.declared_model, context.model
            )));
        }
        for chunk in chunks {
            match &chunk.embedding {
                None => return Err(VectorDataError::MissingEmbedding(chunk.id)),
                Some(v) if v.len() != self.dimension => {
                    return Err(VectorDataError::SchemaMismatch(format!(
                        "vector width {} does not match store width {}",
                        v.len(),
                        self.dimension
                    )));
                }
                Some(_) => {}
            }
        }

        let mut repos = self.lock()?;
        let now = Utc::now();

        let strategy = match repos.get(&context.repo_id) {
            Some(stored)
                if stored.record.status == IndexStatus::Ready
                    && stored.record.commit_hash.as_deref() == Some(context.commit_hash.as_str())
                    && stored.record.embedding_model.as_deref() == Some(context.model.as_str()) =>
            {
                return Ok(WriteOutcome {
                    strategy: WriteStrategy::Skipped,
                    chunks_written: 0,
                });
            }
            Some(stored)
                if stored.record.embedding_model.is_some()
                    && stored.record.embedding_model.as_deref()
                        != Some(context.model.as_str()) =>
            {
                WriteStrategy::FullReindex
            }
            _ => WriteStrategy::Upsert,
        };

        let created_at = repos
            .get(&context.repo_id)
            .map_or(now, |r| r.record.created_at);
        repos.insert(
            context.repo_id.clone(),
            StoredRepo {
                record: RepoIndexRecord {
                    repo_id: context.repo_id.clone(),
                    status: IndexStatus::Ready,
                    commit_hash: Some(context.commit_hash.clone()),
                    default_branch: Some(context.default_branch.clone()),
                    embedding_model: Some(context.model.clone()),
                    chunk_count: chunks.len() as i64,
                    created_at,
                    updated_at: now,
                },
                chunks: chunks.to_vec(),
            },
        );

        Ok(WriteOutcome {
            strategy,
            chunks_written: chunks.len(),
        })
    }

    async fn search(
        &self,
        query: &SearchQuery,
        _correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<ScoredChunk>> {
        let repos = self.lock()?;
        let Some(stored) = repos.get(&query.repo_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = stored
            .chunks
            .iter()
            .filter(|chunk| {
                query.file_filter.as_ref().is_none_or(|pattern| {
                    // LIKE with a trailing % is all the retriever uses
                    pattern
                        .strip_suffix('%')
                        .map_or(chunk.file_path == *pattern, |prefix| {
                            chunk.file_path.starts_with(prefix)
                        })
                })
            })
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                let score = cosine_similarity(embedding, &query.embedding);
                (score >= query.min_score).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    vector_score: score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(query.limit);
        Ok(scored)
    }

    async fn get_index(&self, repo_id: &str) -> VectorDataResult<Option<RepoIndexRecord>> {
        Ok(self.lock()?.get(repo_id).map(|r| r.record.clone()))
    }
}
