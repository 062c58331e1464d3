//! Wookie Server - Turbo Wookie HTTP gateway for MPD.
//!
//! Serves the web frontend, exposes the daemon's library and queue as JSON
//! and proxies its audio stream, all on a single port.

use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::{extract::State, response::Response, routing::get};
use clap::Parser;
use serde_json::json;
use tokio::signal;
use wookie_core::api::response::json_response;
use wookie_core::config::KEY_SERVER_PORT;
use wookie_core::{AppState, ConfigStore, Gateway, SERVICE_ID};

/// Wookie Server - collaborative jukebox gateway for MPD.
#[derive(Parser, Debug)]
#[command(name = "wookie-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "TURBO_WOOKIE_CONFIG"
    )]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "TURBO_WOOKIE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Listen port (overrides `server_port` from the config file).
    #[arg(short = 'p', long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Wookie Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ConfigStore::load(&args.config).with_context(|| {
        format!("Failed to load configuration from {}", args.config.display())
    })?;
    if let Some(port) = args.port {
        config = config
            .with_override(KEY_SERVER_PORT, port.to_string())
            .context("Invalid --port")?;
    }

    log::info!(
        "Configuration: mpd={}, stream={}, server_port={}",
        config.control_addr(),
        config.stream_url(),
        config.server_port()
    );

    let gateway = Gateway::from_config(config)
        .await
        .context("Failed to start gateway")?
        .route("/health", get(health))
        .context("Failed to register /health")?;

    gateway
        .listen_and_serve_with_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Reports the service identity and the watcher's view of the daemon.
async fn health(State(state): State<AppState>) -> Response {
    json_response(&json!({
        "service": SERVICE_ID,
        "version": env!("CARGO_PKG_VERSION"),
        "playback": state.playback.snapshot(),
    }))
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received");
}
