//! Database query modules.

pub mod movies;
