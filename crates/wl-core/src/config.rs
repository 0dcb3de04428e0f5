//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for the HTTP server, the metadata client, the enrichment pool
//! and the CSV seed import. Every section defaults sensibly so a completely
//! empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable consulted when no OMDb key is configured.
pub const OMDB_API_KEY_ENV: &str = "OMDB_API_KEY";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub metadata: MetadataConfig,
    pub enrichment: EnrichmentConfig,
    pub import: ImportConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Fill the OMDb key from [`OMDB_API_KEY_ENV`] when the file left it unset.
    pub fn apply_env(&mut self) {
        if self.metadata.omdb_api_key.is_none() {
            if let Ok(key) = std::env::var(OMDB_API_KEY_ENV) {
                if !key.trim().is_empty() {
                    self.metadata.omdb_api_key = Some(key);
                }
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.metadata.omdb_api_key.is_none() {
            warnings.push(format!(
                "metadata.omdb_api_key is not set (nor {OMDB_API_KEY_ENV}); plot enrichment is disabled"
            ));
        }

        if self.metadata.plot != "short" && self.metadata.plot != "full" {
            warnings.push(format!(
                "metadata.plot '{}' is not recognized (valid: short, full)",
                self.metadata.plot
            ));
        }

        if self.metadata.requests_per_second == 0 {
            warnings.push("metadata.requests_per_second is 0; rate limiting is disabled".into());
        }

        let worst_case = self.metadata.worst_case_lookup();
        if self.enrichment.fetch_timeout() < worst_case {
            warnings.push(format!(
                "enrichment.fetch_timeout_secs ({}s) is shorter than the worst-case lookup with retries ({:.1}s); late retries will be cut off",
                self.enrichment.fetch_timeout_secs,
                worst_case.as_secs_f64()
            ));
        }

        if self.import.enabled && !self.import.csv_path.exists() {
            warnings.push(format!(
                "import.csv_path {} does not exist; seeding will be skipped",
                self.import.csv_path.display()
            ));
        }

        warnings
    }

    /// Check the settings that would make the service unusable.
    pub fn validate_strict(&self) -> Result<()> {
        if self.enrichment.workers == 0 {
            return Err(Error::Validation(
                "enrichment.workers must be at least 1".into(),
            ));
        }
        if self.enrichment.fetch_timeout_secs == 0 {
            return Err(Error::Validation(
                "enrichment.fetch_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8090,
            db_path: PathBuf::from("movies.db"),
        }
    }
}

/// OMDb client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub omdb_api_key: Option<String>,
    pub base_url: String,
    /// Plot length requested from OMDb ("short" or "full").
    pub plot: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub requests_per_second: u32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            omdb_api_key: None,
            base_url: "http://www.omdbapi.com/".into(),
            plot: "short".into(),
            request_timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5_000,
            requests_per_second: 10,
        }
    }
}

impl MetadataConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Longest a lookup can take when every attempt times out and every
    /// backoff runs to its computed delay.
    pub fn worst_case_lookup(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff: u64 = (0..self.max_retries)
            .map(|i| {
                self.retry_base_delay_ms
                    .saturating_mul(2u64.saturating_pow(i))
                    .min(self.retry_max_delay_ms)
            })
            .fold(0u64, u64::saturating_add);
        self.request_timeout()
            .saturating_mul(attempts)
            .saturating_add(Duration::from_millis(backoff))
    }
}

/// Enrichment pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Number of concurrent workers; must be at least 1.
    pub workers: usize,
    /// Deadline for a single plot lookup, retries included. Should cover
    /// [`MetadataConfig::worst_case_lookup`] or the last retry gets cut off.
    pub fetch_timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            fetch_timeout_secs: 45,
        }
    }
}

impl EnrichmentConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// First-run CSV seeding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub enabled: bool,
    pub csv_path: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            csv_path: PathBuf::from("watchlist.csv"),
        }
    }
}
