//! Repomind API server
//!
//! HTTP API for code-aware retrieval-augmented answers: repository
//! indexing jobs, synchronous queries, and the SSE pipeline stream.

use std::net::SocketAddr;

use repomind_config::ApplicationConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    repomind_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("starting repomind API server");

    let config = ApplicationConfig::from_env()?;
    info!(
        port = config.api.port,
        database = %config.database.safe_connection_string(),
        workers = config.indexing.worker_concurrency,
        "configuration loaded"
    );

    let app = repomind_api::bootstrap::build(&config).await?;

    // Background plane: worker pool draining the job queue
    let shutdown = app.workers.shutdown_token();
    let workers = tokio::spawn(async move { app.workers.run().await });

    // Request plane: axum server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app.router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    shutdown.cancel();
    let _ = workers.await;
    info!("repomind API server stopped");
    Ok(())
}
