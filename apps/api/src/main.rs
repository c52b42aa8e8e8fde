mod config;
mod errors;
mod interview;
mod llm_client;
mod peer;
mod presenter;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::interview::{Engine, EngineSettings};
use crate::llm_client::{ModelBackend, ModelClient};
use crate::routes::build_router;
use crate::state::AppState;

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

    info!("Starting Career Interview v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model client
    let llm: Arc<dyn ModelBackend> = Arc::new(ModelClient::new(
        config.api_endpoint.clone(),
        config.model.clone(),
        config.max_tokens,
    ));
    info!(
        "Model client initialized (model: {}, endpoint: {})",
        llm.model_name(),
        config.api_endpoint
    );

    // Engine settings are a frozen copy; export metadata matches what ran
    let settings = EngineSettings {
        form_version: config.form_version.clone(),
        dates_placeholder: config.dates_placeholder.clone(),
        link_placeholder: config.link_placeholder.clone(),
        placeholder_text: config.placeholder_text.clone(),
    };

    let state = AppState {
        engine: Arc::new(Engine::new(settings, llm.clone())),
        llm,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
