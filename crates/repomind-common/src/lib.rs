//! Shared primitives used across repomind crates
//!
//! Keeps the cross-cutting pieces small: correlation ids for tracing,
//! the canonical repository identity, the error taxonomy every crate
//! error maps into, and one-shot environment bootstrap.

pub mod error;
pub mod init;
pub mod repo;
pub mod tracing;

pub use error::{ErrorClass, ErrorKind};
pub use init::initialize_environment;
pub use repo::{RepoId, RepoIdError};
pub use tracing::CorrelationId;
