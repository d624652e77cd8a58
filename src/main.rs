use anyhow::{Context, Result};
use island_value::api::{create_router, AppState};
use island_value::command::ValueCommand;
use island_value::config::{load_config, ServiceConfig};
use island_value::display::DisplayBoard;
use island_value::presence::PresenceRegistry;
use island_value::provider::FeedProvider;
use island_value::service::WorthService;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "island_value=info".into()),
        )
        .init();

    info!("Island value service starting...");

    // File config is optional; environment overrides apply on top
    let config = match std::env::var("ISLAND_VALUE_CONFIG") {
        Ok(path) => load_config(&PathBuf::from(path))?,
        Err(_) => ServiceConfig::default(),
    }
    .apply_env();

    info!(
        feed_path = ?config.provider.feed_path,
        port = config.api.port,
        refresh_interval_seconds = config.cache.refresh_interval_seconds,
        "Configuration loaded"
    );

    // One-time capability check
    let feed = Arc::new(FeedProvider::detect(&config.provider));
    let presence = Arc::new(PresenceRegistry::new());
    let board = Arc::new(DisplayBoard::new());

    let service = Arc::new(WorthService::new(
        feed.clone(),
        presence.clone(),
        board.clone(),
        config.clone(),
    ));
    let command = Arc::new(ValueCommand::new(Arc::clone(&service), presence.clone()));

    service.start().await;

    // Start HTTP API server
    let router = create_router(AppState {
        service: Arc::clone(&service),
        feed,
        presence,
        board,
        command,
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api.port))
        .await
        .context("Failed to bind API port")?;
    info!(port = config.api.port, "API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    // Graceful shutdown
    server_handle.abort();
    service.shutdown().await;
    info!("Island value service stopped");

    Ok(())
}
