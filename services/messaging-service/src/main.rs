// Main Entry Point untuk Messaging Service
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod domain;
mod error;
mod handlers;
mod messaging;
mod middleware;
mod realtime;
mod repositories;
mod routes;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "messaging_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("💬 Starting Messaging Service");

    let config = config::AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    let state = config::AppState::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize app state: {}", e))?;
    tracing::info!("✅ Application state initialized (storage: {})", state.store.backend());

    tracing::info!("🌍 Environment: {}", state.config.environment);
    if state.config.is_production() {
        tracing::warn!("🚨 Running in PRODUCTION mode");
    } else {
        tracing::info!("🧪 Running in DEVELOPMENT mode");
    }

    let addr = state.config.bind_address();
    let app = routes::create_router(state.clone());

    tracing::info!("🎯 Messaging Service listening on {}", addr);
    tracing::info!("   - OpenAPI: http://{}/api-docs/openapi.json", addr);
    tracing::info!("   - Health Check: http://{}/health", addr);
    tracing::info!("🔌 WebSocket Endpoint: ws://{}:{}/ws?userId=<id>", state.config.host(), state.config.port());

    // Graceful shutdown setup
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Gagal memasang handler ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("🛑 Received shutdown signal");
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Gagal bind ke {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server berhenti dengan error")?;

    tracing::info!("👋 Messaging Service shutdown complete");

    Ok(())
}
