//! wl-server: HTTP API, OMDb client, plot enrichment pool and CSV seeding.
//!
//! This crate ties the core and db crates together into a running service.
//! It provides:
//!
//! - Axum-based HTTP API for listing, adding and enriching movies
//! - OMDb plot lookups behind the [`omdb::PlotSource`] seam
//! - A fixed-size enrichment worker pool ([`enrichment::Enricher`])
//! - First-run seeding from a CSV export
//! - Graceful shutdown via signal handling

pub mod context;
pub mod enrichment;
pub mod error;
pub mod middleware;
pub mod omdb;
pub mod router;
pub mod routes;
pub mod seed;
pub mod store;

use std::net::SocketAddr;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use wl_core::config::Config;
use wl_core::{Error, Result};
use wl_db::pool::DbPool;

use crate::context::AppContext;
use crate::enrichment::EnrichmentReport;

/// Open (or create) the database named in the config.
pub fn open_database(config: &Config) -> Result<DbPool> {
    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }

    let db_str = db_path.to_string_lossy();
    let db = wl_db::pool::init_pool(&db_str)?;
    if existed {
        tracing::info!("Database opened (existing) at {db_str}");
    } else {
        tracing::info!("Database created (new) at {db_str}");
    }
    Ok(db)
}

/// Start the watchlist server.
///
/// Opens the database, seeds it from CSV on first run, and serves the HTTP
/// API until a shutdown signal arrives. A database that cannot be opened is
/// fatal; a seed import failure is logged and the server starts anyway.
pub async fn start(config: Config) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }
    config.validate_strict()?;

    let db = open_database(&config)?;

    match seed::seed_if_empty(&db, &config.import) {
        Ok(outcome) => tracing::debug!(?outcome, "Seed check complete"),
        Err(e) => tracing::error!(error = %e, "CSV seed import failed"),
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(db, config)?;
    let cancel = ctx.shutdown.clone();
    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    // Stop any enrichment run still in flight.
    cancel.cancel();

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Run a single enrichment pass outside the HTTP server.
///
/// Ctrl+C cancels the run; the partial report is still returned.
pub async fn enrich_once(config: Config) -> Result<EnrichmentReport> {
    config.validate_strict()?;
    let db = open_database(&config)?;
    let ctx = AppContext::new(db, config)?;
    let enricher = ctx.enricher()?;

    let cancel = ctx.shutdown.clone();
    let watcher = tokio::spawn(shutdown_signal(cancel.clone()));
    let report = enricher.run(cancel).await;
    watcher.abort();

    report
}

/// Import a CSV file into the configured database, regardless of whether it
/// already holds movies.
pub fn import_csv(config: &Config, path: &Path) -> Result<usize> {
    let db = open_database(config)?;
    seed::import_file(&db, path)
}

/// Wait for a shutdown signal (SIGINT or SIGTERM), then cancel `cancel`.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
