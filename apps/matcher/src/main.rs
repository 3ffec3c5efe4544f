mod candidates;
mod config;
mod db;
mod embeddings;
mod errors;
mod explainer;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::candidates::parser::LlmProfileParser;
use crate::config::Config;
use crate::db::connect_store;
use crate::embeddings::HttpEmbedder;
use crate::explainer::LlmExplainer;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MatchStore, MemoryMatchStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors are fatal before anything else starts
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matcher v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the store: PostgreSQL when configured, in-memory otherwise
    let store: Arc<dyn MatchStore> = match &config.database_url {
        Some(url) => Arc::new(connect_store(url).await?),
        None => {
            warn!("DATABASE_URL not set, using the in-memory store (nothing survives a restart)");
            Arc::new(MemoryMatchStore::new())
        }
    };

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize embedding client
    let embedder = HttpEmbedder::new(config.embedding.clone())?;
    info!(
        "Embedding client initialized (model: {})",
        config.embedding.model
    );

    info!(
        similarity_weight = config.matching.similarity_weight,
        skill_threshold = config.matching.skill_threshold,
        max_job_views = config.matching.max_job_views,
        top_n = config.matching.top_n,
        "Matching settings"
    );

    // Build app state
    let state = AppState {
        store,
        embedder: Arc::new(embedder),
        explainer: Arc::new(LlmExplainer::new(llm.clone())),
        profile_parser: Arc::new(LlmProfileParser::new(llm)),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
