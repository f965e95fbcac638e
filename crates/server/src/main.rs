//! Hopper server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use hopper_core::config::AppConfig;
use hopper_server::{AppState, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hopper - A chunked file upload coordinator
#[derive(Parser, Debug)]
#[command(name = "hopperd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "HOPPER_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Hopper v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. The file is optional: every setting has a default
    // and env vars can provide or override everything.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("HOPPER_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Register Prometheus metrics
    hopper_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Initialize storage backend
    let store = hopper_store::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::info!(backend = store.backend_name(), "Storage backend initialized");

    // Verify storage is usable before accepting requests.
    store
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend connectivity verified");

    // Create application state
    let state = AppState::new(config.clone(), store);

    // Spawn the idle-session sweeper if enabled
    if config.sweep.enabled {
        hopper_server::sweep::spawn_sweep_task(
            state.registry.clone(),
            state.cancel.clone(),
            config.sweep.clone(),
        );
    } else {
        tracing::info!("Idle-session sweeper disabled");
    }

    let cancel = state.cancel.clone();
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancel whatever partial uploads remain so no stray chunk directories
    // survive the shutdown.
    let drained = cancel.drain().await;
    if drained > 0 {
        tracing::info!(sessions = drained, "Cancelled in-progress uploads on shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
