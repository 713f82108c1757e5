//! Application state for axum handlers
//!
//! All services are constructed once at startup and shared by every
//! handler; nothing expensive is built per-request.

use std::sync::Arc;

use repomind_meta_data::MetaRepository;
use repomind_rag::RagPipeline;

/// Shared services injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// Metadata layer: repo records and the job queue
    pub meta: Arc<dyn MetaRepository>,
    /// Query-plane pipeline: retrieve, assemble, generate
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(meta: Arc<dyn MetaRepository>, pipeline: Arc<RagPipeline>) -> Self {
        Self { meta, pipeline }
    }
}
