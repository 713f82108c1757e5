//! Repomind vector storage crate
//!
//! Persists chunks with their embeddings in Postgres (pgvector) and
//! implements the writer policy: commit-hash dedup, upsert for same-model
//! refreshes, full reindex on model change, all under a per-repo
//! advisory lock in one transaction.

pub mod error;
pub mod mock;
pub mod pgvector;
pub mod traits;

pub use error::{VectorDataError, VectorDataResult};
pub use mock::MockVectorStore;
pub use pgvector::PgVectorStore;
pub use traits::{ScoredChunk, SearchQuery, VectorStore, WriteContext, WriteOutcome, WriteStrategy};
