//! # Cafe POS API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Startup                                          │
//! │                                                                         │
//! │  tracing (RUST_LOG) ──► AppConfig::load ──► Database::new (migrate)    │
//! │                                                 │                       │
//! │                          PinGate::from_config ◄─┘                       │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                 axum::serve ... with_graceful_shutdown                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cafe_api::auth::PinGate;
use cafe_api::config::AppConfig;
use cafe_api::{build_router, AppState};
use cafe_db::{Database, DbConfig};

const DEFAULT_LOG_FILTER: &str = "info,cafe_api=debug,cafe_db=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    info!("Starting Cafe POS API server...");

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.server.bind_addr,
        database = %config.database.path.display(),
        store = %config.store.name,
        "Configuration loaded"
    );

    let db_config = DbConfig::new(&config.database.path);
    let db_config = if db_config.is_in_memory() {
        warn!("Using an in-memory database; data is lost on exit");
        DbConfig::in_memory()
    } else {
        db_config.max_connections(config.database.max_connections)
    };
    let db = Database::new(db_config)
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    let pin_gate = PinGate::from_config(&config.auth).context("Invalid admin PIN setup")?;

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %listener.local_addr()?, "Listening");

    let state = AppState::new(db.clone(), config, pin_gate);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "Failed to listen for Ctrl+C");
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
                warn!(?e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
