//! wl-core: shared error type and application configuration.
//!
//! This crate is the foundational dependency for the other wl-* crates,
//! providing a unified [`Error`] and the [`config::Config`] tree loaded at
//! startup.

pub mod config;
pub mod error;

pub use error::{Error, Result};
