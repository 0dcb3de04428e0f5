//! Plot enrichment pool.
//!
//! [`Enricher::run`] reads every movie from the [`MovieStore`], hands them
//! one at a time to a fixed number of workers over a single shared queue, and
//! writes each fetched plot back through the store. A failed lookup or write
//! only affects its own movie: it is logged, recorded in the
//! [`EnrichmentReport`], and the batch carries on.
//!
//! `run` does not return until every worker has finished, so a caller that
//! sees the report knows all writes have landed.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wl_core::config::EnrichmentConfig;
use wl_core::{Error, Result};
use wl_db::models::Movie;

use crate::omdb::PlotSource;
use crate::store::MovieStore;

/// Capacity of the work queue. tokio channels cannot be zero-sized, so one
/// slot is the closest to a direct hand-off between dispatcher and worker.
const QUEUE_CAPACITY: usize = 1;

// ---------------------------------------------------------------------------
// Settings and report
// ---------------------------------------------------------------------------

/// Tunables for a single enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Number of concurrent workers (at least 1).
    pub workers: usize,
    /// Deadline for one plot lookup.
    pub fetch_timeout: Duration,
}

impl EnrichmentSettings {
    pub fn from_config(cfg: &EnrichmentConfig) -> Self {
        Self {
            workers: cfg.workers,
            fetch_timeout: cfg.fetch_timeout(),
        }
    }
}

/// A movie whose plot could not be refreshed.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EnrichmentFailure {
    pub id: String,
    pub error: String,
}

/// Summary of one enrichment run.
#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct EnrichmentReport {
    /// Movies read from the store at the start of the run.
    pub total: usize,
    /// Movies whose plot was written.
    pub updated: usize,
    /// Movies whose lookup or write failed.
    pub failed: usize,
    pub failures: Vec<EnrichmentFailure>,
    /// The run was cancelled before every movie was processed.
    pub cancelled: bool,
}

impl EnrichmentReport {
    fn absorb(&mut self, outcome: WorkerOutcome) {
        self.updated += outcome.updated;
        self.failed += outcome.failures.len();
        self.failures.extend(outcome.failures);
    }
}

/// What a single worker accomplished before it stopped.
#[derive(Debug, Default)]
struct WorkerOutcome {
    updated: usize,
    failures: Vec<EnrichmentFailure>,
}

enum ItemOutcome {
    Updated,
    Failed(Error),
    Cancelled,
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Fan-out worker pool that fills in plot text for every stored movie.
pub struct Enricher {
    store: Arc<dyn MovieStore>,
    source: Arc<dyn PlotSource>,
    settings: EnrichmentSettings,
}

impl Enricher {
    /// Create an enricher. Fails if `settings.workers` is zero.
    pub fn new(
        store: Arc<dyn MovieStore>,
        source: Arc<dyn PlotSource>,
        settings: EnrichmentSettings,
    ) -> Result<Self> {
        if settings.workers == 0 {
            return Err(Error::Validation(
                "enrichment needs at least one worker".into(),
            ));
        }
        Ok(Self {
            store,
            source,
            settings,
        })
    }

    /// Run one enrichment batch over the current contents of the store.
    ///
    /// Returns once all workers have terminated. Only a failure to read the
    /// movie list, or a worker panic, is returned as an error; per-movie
    /// failures are reported in the [`EnrichmentReport`].
    pub async fn run(&self, cancel: CancellationToken) -> Result<EnrichmentReport> {
        let store = self.store.clone();
        let movies = tokio::task::spawn_blocking(move || store.read_all())
            .await
            .map_err(|e| Error::Internal(format!("movie read task failed: {e}")))??;

        let total = movies.len();
        info!(
            total,
            workers = self.settings.workers,
            "Starting plot enrichment"
        );

        let (tx, rx) = mpsc::channel::<Movie>(QUEUE_CAPACITY);
        let queue = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.settings.workers {
            workers.spawn(run_worker(
                worker_id,
                queue.clone(),
                self.store.clone(),
                self.source.clone(),
                self.settings.fetch_timeout,
                cancel.clone(),
            ));
        }
        drop(queue);

        let mut dispatched = 0usize;
        for movie in movies {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(dispatched, total, "Enrichment cancelled; stopping dispatch");
                    break;
                }
                sent = tx.send(movie) => {
                    if sent.is_err() {
                        // Every worker is gone; nothing left to hand work to.
                        warn!(dispatched, total, "All enrichment workers exited early");
                        break;
                    }
                    dispatched += 1;
                }
            }
        }
        // Closing the queue lets workers drain what is left and stop.
        drop(tx);

        let mut report = EnrichmentReport {
            total,
            ..EnrichmentReport::default()
        };
        let mut panicked = 0usize;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => report.absorb(outcome),
                Err(e) => {
                    panicked += 1;
                    error!(error = %e, "Enrichment worker terminated abnormally");
                }
            }
        }

        if panicked > 0 {
            return Err(Error::Internal(format!(
                "{panicked} enrichment worker(s) terminated abnormally"
            )));
        }

        report.cancelled = cancel.is_cancelled() && report.updated + report.failed < total;

        info!(
            total = report.total,
            updated = report.updated,
            failed = report.failed,
            cancelled = report.cancelled,
            "Plot enrichment finished"
        );

        Ok(report)
    }
}

/// Worker loop: take movies off the shared queue until it is closed and
/// drained, or the run is cancelled.
async fn run_worker(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Movie>>>,
    store: Arc<dyn MovieStore>,
    source: Arc<dyn PlotSource>,
    fetch_timeout: Duration,
    cancel: CancellationToken,
) -> WorkerOutcome {
    debug!(worker_id, "Enrichment worker started");
    let mut outcome = WorkerOutcome::default();

    loop {
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                movie = rx.recv() => movie,
            }
        };
        let Some(movie) = next else {
            break;
        };

        debug!(worker_id, movie_id = %movie.id, "Fetching plot");

        match enrich_one(&movie, &store, &source, fetch_timeout, &cancel).await {
            ItemOutcome::Updated => outcome.updated += 1,
            ItemOutcome::Failed(e) => {
                warn!(
                    worker_id,
                    movie_id = %movie.id,
                    error = %e,
                    "Plot enrichment failed; continuing with next movie"
                );
                outcome.failures.push(EnrichmentFailure {
                    id: movie.id,
                    error: e.to_string(),
                });
            }
            ItemOutcome::Cancelled => break,
        }
    }

    debug!(
        worker_id,
        updated = outcome.updated,
        failed = outcome.failures.len(),
        "Enrichment worker stopped"
    );
    outcome
}

/// Fetch and store the plot for one movie.
async fn enrich_one(
    movie: &Movie,
    store: &Arc<dyn MovieStore>,
    source: &Arc<dyn PlotSource>,
    fetch_timeout: Duration,
    cancel: &CancellationToken,
) -> ItemOutcome {
    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => return ItemOutcome::Cancelled,
        fetched = tokio::time::timeout(fetch_timeout, source.fetch_plot(&movie.id)) => fetched,
    };

    let plot = match fetched {
        Ok(Ok(plot)) => plot,
        Ok(Err(e)) => return ItemOutcome::Failed(e),
        Err(_) => {
            return ItemOutcome::Failed(Error::metadata(
                &movie.id,
                format!("lookup timed out after {}s", fetch_timeout.as_secs_f32()),
            ))
        }
    };

    let store = store.clone();
    let id = movie.id.clone();
    let written = tokio::task::spawn_blocking(move || store.update_plot(&id, &plot)).await;

    match written {
        Ok(Ok(())) => {
            info!(movie_id = %movie.id, "Updated movie plot");
            ItemOutcome::Updated
        }
        Ok(Err(e)) => ItemOutcome::Failed(e),
        Err(e) => ItemOutcome::Failed(Error::Internal(format!("plot write task failed: {e}"))),
    }
}
