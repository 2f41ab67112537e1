//! ChannelHub Server: real-time channel broadcast gateway
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use channelhub_api::{AppState, build_router};
use channelhub_cache::CacheManager;
use channelhub_core::config::AppConfig;
use channelhub_core::error::AppError;
use channelhub_realtime::RealtimeEngine;
use channelhub_realtime::auth::HttpAuthService;

/// ChannelHub: real-time channel broadcast gateway
#[derive(Debug, Parser)]
#[command(name = "channelhub-server", version, about, long_about = None)]
struct Cli {
    /// Directory holding default.toml and the environment overlays
    #[arg(short, long, default_value = "config")]
    config_dir: String,

    /// Environment overlay to load (falls back to CHANNELHUB_ENV)
    #[arg(short, long)]
    env: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let env = cli
        .env
        .or_else(|| std::env::var("CHANNELHUB_ENV").ok())
        .unwrap_or_else(|| "development".to_string());

    let config = match AppConfig::load(&cli.config_dir, &env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(config_dir = %cli.config_dir, env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting ChannelHub v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // ── Step 1: Initialize cache ─────────────────────────────────
    tracing::info!(
        "Initializing cache (provider: {})...",
        config.cache.provider
    );
    let cache = Arc::new(CacheManager::new(&config.cache).await?);
    tracing::info!("Cache initialized");

    // ── Step 2: Authorization service client ─────────────────────
    let auth_service = Arc::new(HttpAuthService::new(&config.auth)?);
    tracing::info!(base_url = %config.auth.base_url, "Authorization service configured");

    // ── Step 3: Gateway engine ───────────────────────────────────
    let engine = RealtimeEngine::new(
        &config.realtime,
        &config.auth,
        auth_service,
        Arc::clone(&cache),
    );

    // ── Step 4: Backend bus ──────────────────────────────────────
    tracing::info!("Starting bus (provider: {})...", config.bus.provider);
    let bus = engine.start_bus(&config.bus)?;

    // ── Step 5: Build and start HTTP server ──────────────────────
    let state = AppState::new(Arc::clone(&config), Arc::clone(&cache), engine.clone());
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ChannelHub server listening on {}", addr);

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_engine.shutdown();
        })
        .await?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    if tokio::time::timeout(grace, bus.join()).await.is_err() {
        tracing::warn!("Bus did not stop within {:?}", grace);
    }

    tracing::info!("ChannelHub server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
