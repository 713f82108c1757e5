//! Global initialization utilities for the application

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the application environment
///
/// Loads `.env` from the working directory (or ancestors) exactly once.
/// Safe to call from every binary and test entry point.
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}
