//! Repomind embeddings crate
//!
//! Turns chunks into fixed-width vectors. A remote provider batches
//! requests against the configured embedding API; a deterministic local
//! fallback keeps development working without credentials. The two sit
//! behind the same [`EmbeddingProvider`] capability.

pub mod error;
pub mod local;
pub mod remote;
pub mod service;
pub mod traits;

pub use error::{EmbeddingError, EmbeddingResult};
pub use local::LocalHashEmbedder;
pub use remote::RemoteEmbeddingClient;
pub use service::{ChunkEmbedder, EmbeddingRun, embed_text};
pub use traits::{EmbeddingProvider, EmbeddingTask};
