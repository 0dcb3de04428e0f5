//! First-run CSV seeding.
//!
//! The seed file is a headerless IMDb-style export. Only four columns are
//! used: the identifier, title, score and release year. Everything else on
//! the row is ignored, and the plot always starts out empty.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use wl_core::config::ImportConfig;
use wl_core::{Error, Result};
use wl_db::models::Movie;
use wl_db::pool::DbPool;
use wl_db::queries::movies;

const COL_ID: usize = 1;
const COL_NAME: usize = 5;
const COL_SCORE: usize = 8;
const COL_YEAR: usize = 10;
const MIN_COLUMNS: usize = COL_YEAR + 1;

/// What [`seed_if_empty`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Rows were imported.
    Imported(usize),
    /// The store already held movies.
    AlreadySeeded,
    /// The seed file does not exist.
    MissingFile,
    /// Seeding is turned off in the config.
    Disabled,
}

/// Parse a numeric column. Blank means zero (unrated or unreleased titles);
/// non-numeric text means the row is unusable.
fn parse_number<T: std::str::FromStr + Default>(field: &str) -> Option<T> {
    if field.is_empty() {
        return Some(T::default());
    }
    field.parse().ok()
}

/// Turn one CSV record into a [`Movie`].
///
/// Returns `None` for rows that are too short or whose numeric columns hold
/// non-numeric text, which covers the header line of a typical export.
pub fn parse_record(record: &csv::StringRecord) -> Option<Movie> {
    if record.len() < MIN_COLUMNS {
        return None;
    }
    let id = record.get(COL_ID)?.to_string();
    if id.is_empty() {
        return None;
    }
    let year = parse_number::<i64>(record.get(COL_YEAR)?)?;
    let score = parse_number::<f64>(record.get(COL_SCORE)?)?;

    Some(Movie {
        id,
        name: record.get(COL_NAME)?.to_string(),
        year,
        score,
        plot: String::new(),
    })
}

/// Read every usable movie from a CSV source.
///
/// Unusable rows and repeated ids are skipped with a warning. A malformed
/// CSV stream (e.g. invalid UTF-8) fails the whole read.
pub fn read_movies<R: Read>(reader: R) -> Result<Vec<Movie>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (idx, record) in csv_reader.records().enumerate() {
        let line = idx + 1;
        let record = record.map_err(|e| Error::Import(format!("line {line}: {e}")))?;

        let Some(movie) = parse_record(&record) else {
            warn!(line, columns = record.len(), "Skipping unusable CSV row");
            continue;
        };

        if !seen.insert(movie.id.clone()) {
            warn!(line, movie_id = %movie.id, "Skipping duplicate id in CSV");
            continue;
        }
        out.push(movie);
    }

    Ok(out)
}

/// Import every movie in `path` in one transaction.
pub fn import_file(pool: &DbPool, path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)?;
    let parsed = read_movies(file)?;

    let conn = wl_db::pool::get_conn(pool)?;
    let count = movies::insert_movies(&conn, &parsed)?;

    info!(path = %path.display(), count, "Imported movies from CSV");
    Ok(count)
}

/// Seed the store from the configured CSV file, but only when it is empty.
pub fn seed_if_empty(pool: &DbPool, cfg: &ImportConfig) -> Result<SeedOutcome> {
    if !cfg.enabled {
        return Ok(SeedOutcome::Disabled);
    }

    let existing = {
        let conn = wl_db::pool::get_conn(pool)?;
        movies::count_movies(&conn)?
    };
    if existing > 0 {
        info!(existing, "Movie store already populated; skipping CSV import");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    if !cfg.csv_path.exists() {
        warn!(path = %cfg.csv_path.display(), "Seed CSV not found; starting with an empty store");
        return Ok(SeedOutcome::MissingFile);
    }

    let count = import_file(pool, &cfg.csv_path)?;
    Ok(SeedOutcome::Imported(count))
}
