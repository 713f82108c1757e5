//! Connection pool construction and migrations

use std::time::Duration;

use repomind_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, migrate::Migrator};

use crate::error::{MetaError, MetaResult};

/// Compiled-in migrations for the repomind schema
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Build the shared Postgres pool from configuration
///
/// # Errors
///
/// Returns an error when the database is unreachable.
pub async fn create_pool(config: &DatabaseConfig) -> MetaResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect(&config.url)
        .await
        .map_err(|e| MetaError::Database(e.to_string()))?;

    tracing::info!(
        url = %config.safe_connection_string(),
        max_connections = config.max_connections,
        "database pool created"
    );
    Ok(pool)
}

/// Apply pending migrations
///
/// # Errors
///
/// Returns an error when a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> MetaResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| MetaError::Migration(e.to_string()))?;
    tracing::info!("database migrations applied");
    Ok(())
}
