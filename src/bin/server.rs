// Relay server entry point.

use anyhow::{Context, Result};
use tldr_stream::api::{AppState, router};
use tldr_stream::core::config::{AppConfig, UpstreamProvider};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tldr_stream::setup_logging();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    if config.provider == UpstreamProvider::OpenAi && config.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; summarize requests will fail with 500");
    }

    let upstream = tldr_stream::ai::build_upstream(&config)?;
    let app = router(AppState::new(upstream));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, provider = ?config.provider, "Relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
