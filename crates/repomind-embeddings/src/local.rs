//! Deterministic local fallback embedder
//!
//! Development-only provider used when no remote credentials are
//! configured. Vectors are derived from a sha256 stream over the input,
//! so identical text always embeds identically and cosine search stays
//! exercisable offline. The model tag marks the space as local; the
//! vector store writer refuses to mix it with a remote space.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::EmbeddingResult;
use crate::traits::{EmbeddingProvider, EmbeddingTask};

/// Hash-derived embedding provider for development
pub struct LocalHashEmbedder {
    model_name: String,
    dimension: usize,
}

impl LocalHashEmbedder {
    pub fn new(model_name: String, dimension: usize) -> Self {
        Self {
            model_name,
            dimension,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let seed = Sha256::digest(text.as_bytes());

        // Expand the seed into as many bytes as the dimension needs
        let mut values = Vec::with_capacity(self.dimension);
        let mut counter = 0u32;
        'outer: loop {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update(counter.to_le_bytes());
            for byte in hasher.finalize() {
                // Map each byte into [-1, 1]
                values.push(f32::from(byte) / 127.5 - 1.0);
                if values.len() == self.dimension {
                    break 'outer;
                }
            }
            counter = counter.wrapping_add(1);
        }

        // L2-normalize so cosine similarity behaves like the real model
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut values {
                *value /= norm;
            }
        }
        values
    }
}

#[async_trait]
impl EmbeddingProvider for LocalHashEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> LocalHashEmbedder {
        LocalHashEmbedder::new("local-dev-hash-256".to_string(), 256)
    }

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let embedder = embedder();
        let a = embedder
            .embed_batch(&["fn main() {}".to_string()], EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        let b = embedder
            .embed_batch(&["fn main() {}".to_string()], EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn vectors_are_normalized_and_distinct() {
        let embedder = embedder();
        let vectors = embedder
            .embed_batch(
                &["alpha".to_string(), "beta".to_string()],
                EmbeddingTask::RetrievalDocument,
            )
            .await
            .unwrap();

        for vector in &vectors {
            assert_eq!(vector.len(), 256);
            let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4, "unit norm, got {norm}");
        }
        assert_ne!(vectors[0], vectors[1]);
    }
}
