//! wl-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, the [`models::Movie`] record, and the movie query
//! module.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
