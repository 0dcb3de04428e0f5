//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary SQLite database and a
//! full [`AppContext`]. The `with_server*` constructors start Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use tempfile::TempDir;
use wiremock::MockServer;

use wl_core::config::Config;
use wl_db::models::Movie;
use wl_db::pool::{init_pool, DbPool};
use wl_server::context::AppContext;
use wl_server::router::build_router;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// file database in a temporary directory.
///
/// A file database (rather than shared-cache memory) lets several
/// enrichment workers write at once under WAL.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    _dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration (no OMDb key).
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.server.db_path = dir.path().join("movies.db");

        let db = init_pool(&config.server.db_path.to_string_lossy())
            .expect("failed to create database pool");
        let ctx = AppContext::new(db.clone(), config).expect("failed to build context");

        Self { ctx, db, _dir: dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> wl_db::pool::PooledConnection {
        wl_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert a movie with an empty plot.
    pub fn add_movie(&self, id: &str, name: &str) -> Movie {
        let movie = Movie {
            id: id.into(),
            name: name.into(),
            year: 1999,
            score: 7.5,
            plot: String::new(),
        };
        wl_db::queries::movies::insert_movie(&self.conn(), &movie).expect("failed to insert movie");
        movie
    }

    /// Fetch a movie straight from the database.
    pub fn movie(&self, id: &str) -> Movie {
        wl_db::queries::movies::get_movie(&self.conn(), id)
            .expect("query failed")
            .expect("movie missing")
    }
}

/// Config that points the OMDb client at a mock server with fast retries.
pub fn omdb_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.metadata.omdb_api_key = Some("test-key".into());
    config.metadata.base_url = format!("{}/", server.uri());
    config.metadata.max_retries = 1;
    config.metadata.retry_base_delay_ms = 1;
    config.metadata.retry_max_delay_ms = 5;
    config.metadata.requests_per_second = 0;
    config.import.enabled = false;
    config
}
