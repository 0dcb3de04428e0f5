//! Connection pool management for SQLite via r2d2.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use wl_core::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Maximum number of pooled connections. Matches the default worker count so
/// every enrichment worker can hold a connection while writing.
const MAX_CONNECTIONS: u32 = 4;

/// Initialize a database pool backed by a file on disk.
///
/// Creates the SQLite file if it does not exist, enables WAL journal mode and
/// a busy timeout on every new connection, and runs pending migrations.
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)?;

    Ok(pool)
}

/// Initialize an in-memory database pool (useful for tests).
///
/// Each call creates a uniquely-named shared-cache in-memory database so
/// that parallel tests do not interfere with each other, while all
/// connections *within* a single pool still share state.
pub fn init_memory_pool() -> Result<DbPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:watchlist_memdb_{n}?mode=memory&cache=shared");

    let manager = SqliteConnectionManager::file(uri)
        .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));

    let pool = Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {e}")))?;

    migrations::run_migrations(&conn)?;

    Ok(pool)
}

/// Convenience helper to get a connection from the pool.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}
