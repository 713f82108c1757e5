//! Service wiring
//!
//! Builds every lifecycle-scoped resource once (pool, clients, services)
//! and hands back the router plus the worker pool. Reinitialization
//! mid-flight is not supported; tests wire mocks against the same
//! capability traits instead.

use std::sync::Arc;

use repomind_config::ApplicationConfig;
use repomind_embeddings::ChunkEmbedder;
use repomind_ingest::GithubFetcher;
use repomind_meta_data::{MetaRepository, PgMetaRepository, create_pool, run_migrations};
use repomind_parsing::Chunker;
use repomind_rag::{AnthropicChat, ChatProvider, ContextAssembler, MockChat, RagPipeline};
use repomind_search::Retriever;
use repomind_vector_data::{PgVectorStore, VectorStore};

use crate::indexer::IndexRunner;
use crate::state::AppState;
use crate::worker::WorkerPool;

/// Fully wired application: HTTP router plus background workers
pub struct Application {
    pub router: axum::Router,
    pub workers: WorkerPool,
}

/// Construct every service from configuration
///
/// # Errors
///
/// Returns an error when the database is unreachable, migrations fail,
/// or a remote client cannot be constructed.
pub async fn build(config: &ApplicationConfig) -> anyhow::Result<Application> {
    let pool = create_pool(&config.database).await?;
    if config.database.auto_migrate {
        run_migrations(&pool).await?;
    }

    let meta: Arc<dyn MetaRepository> = Arc::new(PgMetaRepository::new(pool.clone()));

    let embedder = Arc::new(ChunkEmbedder::from_config(&config.embedding)?);
    let store: Arc<dyn VectorStore> = Arc::new(PgVectorStore::new(
        pool,
        embedder.model_name().to_string(),
        embedder.dimension(),
    ));

    let retriever = Arc::new(Retriever::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
        config.retrieval,
    ));

    let chat: Arc<dyn ChatProvider> = if config.llm.api_key.is_some() {
        Arc::new(AnthropicChat::new(&config.llm)?)
    } else {
        tracing::warn!("LLM_API_KEY not set; answers come from the canned mock provider");
        Arc::new(MockChat::default())
    };

    let pipeline = Arc::new(RagPipeline::new(
        retriever,
        ContextAssembler::new(config.context.char_budget),
        chat,
    ));

    let fetcher = Arc::new(GithubFetcher::new(config.github.clone())?);
    let chunker = Arc::new(Chunker::new(config.chunking));
    let runner = Arc::new(IndexRunner::new(
        fetcher,
        chunker,
        embedder,
        store,
        Arc::clone(&meta),
    ));
    let workers = WorkerPool::new(runner, Arc::clone(&meta), &config.indexing);

    let state = AppState::new(meta, pipeline);
    let router = crate::routes::create_router(state);

    Ok(Application { router, workers })
}
