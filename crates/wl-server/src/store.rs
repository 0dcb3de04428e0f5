//! Record store seam used by the enrichment pool.
//!
//! [`MovieStore`] exposes exactly the two operations the pool needs. The
//! production implementation, [`SqliteMovieStore`], checks a connection out
//! of the shared pool per call, so a single store can be cloned into every
//! worker.

use wl_core::Result;
use wl_db::models::Movie;
use wl_db::pool::DbPool;
use wl_db::queries::movies;

/// Persistent movie records, as seen by the enrichment pool.
///
/// Implementations must be safe to call from several workers at once.
/// Methods are blocking; async callers go through `spawn_blocking`.
pub trait MovieStore: Send + Sync {
    /// Every stored movie, in storage order.
    fn read_all(&self) -> Result<Vec<Movie>>;

    /// Overwrite the plot of the movie with `id`.
    ///
    /// Fails with `Error::NotFound` when no such movie exists.
    fn update_plot(&self, id: &str, plot: &str) -> Result<()>;
}

/// [`MovieStore`] backed by the SQLite connection pool.
#[derive(Clone)]
pub struct SqliteMovieStore {
    pool: DbPool,
}

impl SqliteMovieStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl MovieStore for SqliteMovieStore {
    fn read_all(&self) -> Result<Vec<Movie>> {
        let conn = wl_db::pool::get_conn(&self.pool)?;
        movies::list_movies(&conn)
    }

    fn update_plot(&self, id: &str, plot: &str) -> Result<()> {
        let conn = wl_db::pool::get_conn(&self.pool)?;
        movies::update_plot(&conn, id, plot)
    }
}
