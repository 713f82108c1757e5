//! Route composition

pub mod health;
pub mod index;
pub mod rag;

use axum::Router;

use crate::state::AppState;

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(index::routes())
        .merge(rag::routes())
        .with_state(state)
}
