// Emotion Agent - Web Server
// REST API with Axum: transactions, chat completions, financial assistant

use anyhow::{Context, Result};
use emotion_agent::server::{router, AppState};
use emotion_agent::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    emotion_agent::init_logging();

    let config = Config::from_env().context("Invalid configuration")?;
    info!(?config, "Configuration loaded");

    if config.llm.api_key.is_none() {
        tracing::warn!("DEEPSEEK_API_KEY is not set; chat endpoints will fail");
    }

    let state = AppState::from_config(&config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "🚀 Server running");
    info!("   POST /fetchTransaction  POST /chat/completions  POST /financial-assistant");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
