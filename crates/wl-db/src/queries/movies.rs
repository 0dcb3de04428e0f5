//! Movie CRUD operations.

use rusqlite::{Connection, ErrorCode};
use wl_core::{Error, Result};

use crate::models::Movie;

/// Map an insert failure, turning primary-key violations into `Conflict`.
fn insert_error(id: &str, e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(ref f, _) if f.code == ErrorCode::ConstraintViolation => {
            Error::Conflict(format!("movie {id} already exists"))
        }
        e => Error::database(e.to_string()),
    }
}

/// Insert a single movie.
pub fn insert_movie(conn: &Connection, movie: &Movie) -> Result<()> {
    conn.execute(
        "INSERT INTO movies (id, name, year, score, plot) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![movie.id, movie.name, movie.year, movie.score, movie.plot],
    )
    .map_err(|e| insert_error(&movie.id, e))?;
    Ok(())
}

/// Insert many movies inside one transaction.
///
/// Either every row is written or none is.
pub fn insert_movies(conn: &Connection, movies: &[Movie]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO movies (id, name, year, score, plot) VALUES (?1, ?2, ?3, ?4, ?5)")
            .map_err(|e| Error::database(e.to_string()))?;
        for movie in movies {
            stmt.execute(rusqlite::params![
                movie.id,
                movie.name,
                movie.year,
                movie.score,
                movie.plot
            ])
            .map_err(|e| insert_error(&movie.id, e))?;
        }
    }

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(movies.len())
}

/// Get a movie by its identifier.
pub fn get_movie(conn: &Connection, id: &str) -> Result<Option<Movie>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM movies WHERE id = ?1", Movie::COLUMNS),
        [id],
        Movie::from_row,
    );
    match result {
        Ok(m) => Ok(Some(m)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List every movie in storage (insertion) order.
pub fn list_movies(conn: &Connection) -> Result<Vec<Movie>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM movies ORDER BY rowid",
            Movie::COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Movie::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Overwrite the plot of an existing movie.
///
/// Fails with `NotFound` when no movie has the given id.
pub fn update_plot(conn: &Connection, id: &str, plot: &str) -> Result<()> {
    let n = conn
        .execute(
            "UPDATE movies SET plot = ?1 WHERE id = ?2",
            rusqlite::params![plot, id],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if n == 0 {
        return Err(Error::not_found("movie", id));
    }
    Ok(())
}

/// Number of movies currently stored.
pub fn count_movies(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}
