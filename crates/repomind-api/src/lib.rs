//! Repomind API crate
//!
//! The HTTP surface (axum) over the query plane, plus the background
//! worker pool that drains the indexing job queue. Handlers receive all
//! services through [`state::AppState`]; nothing is constructed
//! per-request.

pub mod bootstrap;
pub mod error;
pub mod indexer;
pub mod routes;
pub mod state;
pub mod worker;

#[cfg(test)]
pub mod test_support;

pub use error::ApiError;
pub use state::AppState;
