//! Repomind metadata crate
//!
//! Owns the Postgres side of repository state: `repo_index` records, the
//! `index_jobs` queue (FOR UPDATE SKIP LOCKED), pool construction, and
//! migrations. Chunk rows live in the same database but are written by
//! `repomind-vector-data` inside the writer transaction.

pub mod error;
pub mod mock;
pub mod models;
pub mod pool;
pub mod repository;
pub mod traits;

pub use error::{MetaError, MetaResult};
pub use mock::MockMetaRepository;
pub use models::{IndexJob, IndexStatus, JobState, RepoIndexRecord};
pub use pool::{create_pool, run_migrations};
pub use repository::PgMetaRepository;
pub use traits::MetaRepository;
