mod config;
mod errors;
mod evaluation;
mod llm_client;
mod models;
mod rag;
mod routes;
mod scoring;
mod state;
mod storage;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::evaluation::detector::LlmViolationDetector;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::FsStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Detector gets its own client so its token budget can differ from other callers
    let llm = LlmClient::new(config.anthropic_api_key.clone())?
        .with_model(config.evaluation_model.clone(), config.evaluation_max_tokens);
    info!(
        "LLM client initialized (model: {}, max tokens: {})",
        llm.model(),
        config.evaluation_max_tokens
    );
    let detector = Arc::new(LlmViolationDetector::new(llm));

    info!(
        "Evaluation records under {}; source facts at {}",
        config.output_dir.display(),
        config.summaries_path.display()
    );
    info!("Attempt budget: {}s", config.attempt_timeout_secs);

    let state = AppState::new(config.clone(), Arc::new(FsStorage), detector);

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
