//! wsc-mailbox - callback mailbox service
//!
//! Receives results from the workflow engine and hands each one to the wizard
//! exactly once.
//!
//! Routes: `/api/{content,example,generation,marcus}-callback` (POST/GET),
//! `/health`. Default port 5790.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wsc_common::config::{load_toml_or_default, resolve_config_path};
use wsc_mailbox::config::{Config, ConfigOverrides, StoreBackend, TomlConfig, MODULE_NAME};
use wsc_mailbox::store::{MailboxStore, MemoryMailbox, SqliteMailbox};
use wsc_mailbox::{build_router, sweeper, AppState};

/// Command-line arguments for wsc-mailbox
#[derive(Parser, Debug)]
#[command(name = "wsc-mailbox")]
#[command(about = "Session-keyed callback mailbox for workflow results")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to <config_dir>/writer-suite/mailbox.toml)
    #[arg(short, long, env = "WSC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "WSC_MAILBOX_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WSC_MAILBOX_PORT")]
    port: Option<u16>,

    /// Mailbox backend
    #[arg(long, value_enum, env = "WSC_MAILBOX_BACKEND")]
    backend: Option<StoreBackend>,

    /// SQLite file for the sqlite backend
    #[arg(long, env = "WSC_MAILBOX_DB")]
    database: Option<PathBuf>,

    /// Seconds an unclaimed result stays deliverable
    #[arg(long, env = "WSC_MAILBOX_TTL_SECS")]
    ttl_secs: Option<u64>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "WSC_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // TOML is read before tracing so its [logging] level can apply
    let config_path = resolve_config_path(args.config.as_deref(), MODULE_NAME);
    let (toml_config, config_source) =
        load_toml_or_default::<TomlConfig>(config_path.as_deref())?;

    let config = Config::resolve(
        toml_config,
        ConfigOverrides {
            host: args.host,
            port: args.port,
            backend: args.backend,
            database_path: args.database,
            ttl_secs: args.ttl_secs,
            log_level: args.log_level,
        },
    )?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wsc_mailbox={0},wsc_common={0},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting Writer Suite callback mailbox (wsc-mailbox) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();

    let store: Arc<dyn MailboxStore> = match config.backend {
        StoreBackend::Memory => {
            info!("Mailbox backend: memory (entries are lost on restart)");
            Arc::new(MemoryMailbox::new())
        }
        StoreBackend::Sqlite => {
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            let store = SqliteMailbox::connect(&config.database_path)
                .await
                .with_context(|| {
                    format!("Failed to open mailbox database {}", config.database_path.display())
                })?;
            info!("Mailbox backend: sqlite at {}", config.database_path.display());
            Arc::new(store)
        }
    };

    info!(
        ttl_secs = config.entry_ttl.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Mailbox entry expiry configured"
    );

    let shutdown = CancellationToken::new();
    let sweeper = sweeper::spawn_sweeper(store.clone(), config.sweep_interval, shutdown.clone());

    let app = build_router(AppState::new(store, config.entry_ttl));

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("wsc-mailbox listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    shutdown.cancel();
    sweeper.await.context("Sweeper task panicked")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
