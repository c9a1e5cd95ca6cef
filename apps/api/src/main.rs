mod agents;
mod config;
mod db;
mod errors;
mod extraction;
mod intake;
mod llm_client;
mod retrieval;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::extraction::ExtractionPipeline;
use crate::llm_client::{GeminiBackend, LlmClient, ModelRegistry};
use crate::retrieval::StaticCorpus;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mentor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Initialize generation client. Model discovery is deferred to the first request.
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; all analyses will use fallback results");
    }
    let backend = GeminiBackend::new(&config.gemini_base_url, config.gemini_api_key.clone())
        .context("Failed to build HTTP client for the generation backend")?;
    let registry = Arc::new(ModelRegistry::with_preferred(
        config.llm_model.as_deref(),
        config.discovery_timeout,
    ));
    let llm = LlmClient::new(Arc::new(backend), registry, config.generation_timeout);
    info!(
        "LLM client initialized (preferred model: {}, timeout: {}s)",
        config.llm_model.as_deref().unwrap_or("auto"),
        config.generation_timeout.as_secs()
    );

    // Initialize reference corpus
    let corpus = Arc::new(StaticCorpus::embedded()?);
    info!(
        "Reference corpus loaded: {} courses, {} job samples",
        corpus.course_count(),
        corpus.job_sample_count()
    );

    let pipeline = ExtractionPipeline::new(llm, corpus.clone(), config.retrieval_top_k);

    // Build app state
    let state = AppState {
        db,
        pipeline,
        corpus,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_allowed_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS restricted to the configured frontend origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
