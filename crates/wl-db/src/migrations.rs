//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use wl_core::{Error, Result};

/// V1: the movie watchlist table.
const V1_MOVIES: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id    TEXT PRIMARY KEY NOT NULL,
    name  TEXT NOT NULL,
    year  INTEGER NOT NULL,
    score REAL NOT NULL,
    plot  TEXT NOT NULL DEFAULT ''
);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_MOVIES)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}
