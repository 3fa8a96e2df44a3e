//! Photomark Web Server.
//!
//! This binary:
//! - Receives LINE webhooks and verifies their signature
//! - Watermarks every LINE-hosted image it receives
//! - Serves and manages the watermarked outputs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use photomark::web::router;
use photomark::{AppState, Config, FfmpegWatermarker, ImagePaths, LineContentClient, WebhookService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        app_domain = %config.app_domain,
        line_content_base_url = %config.line_content_base_url,
        access_token_configured = !config.line_channel_access_token.is_empty(),
        channel_secret_configured = !config.line_channel_secret.is_empty(),
        ffmpeg_path = %config.ffmpeg_path.display(),
        "config_loaded"
    );

    if config.line_channel_secret.is_empty() {
        warn!("line_channel_secret_not_configured");
    }

    // Resolve storage layout once, relative to the working directory
    let working_root = std::env::current_dir().context("Failed to read working directory")?;
    let paths = ImagePaths::rooted_at(
        &working_root,
        &config.incoming_dir,
        &config.output_dir,
        &config.watermark_path,
    );
    paths
        .ensure_directories()
        .await
        .context("Failed to create image directories")?;

    if !paths.watermark_path().exists() {
        warn!(path = %paths.watermark_path().display(), "watermark_asset_missing");
    }

    info!(
        incoming_root = %paths.incoming_root().display(),
        output_root = %paths.output_root().display(),
        watermark_path = %paths.watermark_path().display(),
        "image_paths_resolved"
    );

    // Build pipeline components
    let fetcher = LineContentClient::new(
        &config.line_content_base_url,
        config.line_channel_access_token.clone(),
        Duration::from_millis(config.content_fetch_timeout_ms),
    )
    .context("Failed to create LINE content client")?;
    let watermarker = FfmpegWatermarker::new(config.ffmpeg_path.clone());
    let webhook = WebhookService::new(Arc::new(fetcher), Arc::new(watermarker), paths);

    // Create application state
    let port = config.port;
    let state = AppState::new(config, webhook);
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
