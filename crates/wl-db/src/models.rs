//! Rust structs mapping to database tables.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Movie
// ---------------------------------------------------------------------------

/// A single watchlist entry.
///
/// `id` is the external (IMDb) identifier and the primary key. `plot` stays
/// empty until an enrichment run fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub name: String,
    pub year: i64,
    pub score: f64,
    #[serde(default)]
    pub plot: String,
}

impl Movie {
    /// Column list matching [`Movie::from_row`].
    pub const COLUMNS: &'static str = "id, name, year, score, plot";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            year: row.get(2)?,
            score: row.get(3)?,
            // Rows written by older imports may carry a NULL plot.
            plot: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }
}
