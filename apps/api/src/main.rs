mod assessments;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessments::orchestrator::SuggestionOrchestrator;
use crate::config::Config;
use crate::db::create_store;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed optional values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerAI API v{}", env!("CARGO_PKG_VERSION"));

    let missing = config.suggestions.missing();
    if !missing.is_empty() {
        warn!(
            "Missing {}; suggestion requests will fail until configured",
            missing.join(", ")
        );
    }

    // Initialize LLM client
    let timeout = Duration::from_secs(config.llm_timeout_secs);
    let llm = LlmClient::new(
        &config.llm_api_url,
        config.llm_model.clone(),
        config.suggestions.llm_api_key.clone().unwrap_or_default(),
        timeout,
    )?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm.model(),
        timeout.as_secs()
    );

    // Initialize assessment store
    let http = reqwest::Client::builder().timeout(timeout).build()?;
    let store = create_store(&config.suggestions, http)?;

    let suggestions = Arc::new(SuggestionOrchestrator::new(
        config.suggestions.clone(),
        Arc::new(llm),
        store.clone(),
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        suggestions,
        store,
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
