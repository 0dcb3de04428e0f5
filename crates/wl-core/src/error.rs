//! Unified error type for the watchlist service.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in the watchlist.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "movie").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conflicting resource already exists, or an exclusive operation is
    /// already running.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The external metadata service failed or returned something unusable.
    #[error("Metadata error [{id}]: {message}")]
    Metadata {
        /// The movie identifier that was being looked up.
        id: String,
        /// Human-readable error description.
        message: String,
    },

    /// Reading the CSV seed file failed.
    #[error("Import error: {0}")]
    Import(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Metadata { .. } => 502,
            Error::Import(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::Database { .. } => "database_error",
            Error::Io { .. } => "io_error",
            Error::Metadata { .. } => "metadata_error",
            Error::Import(_) => "import_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Metadata`].
    pub fn metadata(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Metadata {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
