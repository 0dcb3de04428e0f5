//! Shared application context.
//!
//! [`AppContext`] is handed to every route handler via Axum state. It owns
//! the connection pool, the movie store seam, the optional plot source and
//! the lock that keeps enrichment runs from overlapping.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use wl_core::config::Config;
use wl_core::{Error, Result};
use wl_db::pool::DbPool;

use crate::enrichment::{Enricher, EnrichmentSettings};
use crate::omdb::{OmdbClient, PlotSource};
use crate::store::{MovieStore, SqliteMovieStore};

/// Application context shared by all request handlers (via Axum state).
///
/// Cheap to clone; every field is a handle.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Record store used by the enrichment pool.
    pub store: Arc<dyn MovieStore>,
    /// Plot lookup service. `None` when no API key is configured.
    pub plot_source: Option<Arc<dyn PlotSource>>,
    /// Held for the duration of an enrichment run.
    pub enrichment_lock: Arc<Mutex<()>>,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Build a context backed by SQLite, creating an OMDb client when the
    /// config carries an API key.
    pub fn new(db: DbPool, config: Config) -> Result<Self> {
        let plot_source: Option<Arc<dyn PlotSource>> = match config.metadata.omdb_api_key {
            Some(_) => Some(Arc::new(OmdbClient::new(&config.metadata)?)),
            None => None,
        };
        Ok(Self::with_plot_source(db, config, plot_source))
    }

    /// Build a context with an explicit plot source.
    pub fn with_plot_source(
        db: DbPool,
        config: Config,
        plot_source: Option<Arc<dyn PlotSource>>,
    ) -> Self {
        Self {
            store: Arc::new(SqliteMovieStore::new(db.clone())),
            db,
            config: Arc::new(config),
            plot_source,
            enrichment_lock: Arc::new(Mutex::new(())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Assemble an [`Enricher`] from the configured store, source and
    /// worker settings.
    pub fn enricher(&self) -> Result<Enricher> {
        let source = self.plot_source.clone().ok_or_else(|| {
            Error::Validation("OMDb API key not configured; enrichment is disabled".into())
        })?;
        Enricher::new(
            self.store.clone(),
            source,
            EnrichmentSettings::from_config(&self.config.enrichment),
        )
    }
}
