//! OMDb (Open Movie Database) plot lookup client.
//!
//! Resolves a single IMDb identifier to its plot text. Requests are
//! rate-limited with [`governor`], time-bounded by the reqwest client
//! timeout, and retried with exponential backoff on transport errors,
//! HTTP 5xx and HTTP 429 (honouring `Retry-After`).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use wl_core::config::MetadataConfig;
use wl_core::{Error, Result};

/// OMDb's placeholder for a missing field.
const NOT_AVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// PlotSource
// ---------------------------------------------------------------------------

/// Anything that can turn a movie identifier into plot text.
///
/// An empty string means the source has no plot for that movie; it is not
/// an error.
#[async_trait]
pub trait PlotSource: Send + Sync {
    async fn fetch_plot(&self, id: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Bounded exponential backoff for retryable lookup failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &MetadataConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.retry_base_delay_ms),
            max_delay: Duration::from_millis(cfg.retry_max_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// A server-provided `Retry-After` wins but is still capped.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(server_delay) = retry_after {
            return server_delay.min(self.max_delay);
        }
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Outcome of a single failed HTTP attempt.
struct AttemptError {
    error: Error,
    retryable: bool,
    retry_after: Option<Duration>,
}

impl AttemptError {
    fn fatal(error: Error) -> Self {
        Self {
            error,
            retryable: false,
            retry_after: None,
        }
    }

    fn transient(error: Error, retry_after: Option<Duration>) -> Self {
        Self {
            error,
            retryable: true,
            retry_after,
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl OmdbResponse {
    fn into_plot(self) -> String {
        match self.plot {
            Some(plot) if plot != NOT_AVAILABLE => plot,
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    plot: String,
    retry: RetryPolicy,
    limiter: Option<Arc<DirectLimiter>>,
}

impl OmdbClient {
    /// Build a client from the metadata settings.
    ///
    /// Fails when no API key is configured.
    pub fn new(cfg: &MetadataConfig) -> Result<Self> {
        let api_key = cfg
            .omdb_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Validation("OMDb API key not configured".into()))?;

        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        let limiter = NonZeroU32::new(cfg.requests_per_second)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            api_key,
            plot: cfg.plot.clone(),
            retry: RetryPolicy::from_config(cfg),
            limiter,
        })
    }

    async fn request_plot(&self, id: &str) -> std::result::Result<String, AttemptError> {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }

        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("i", id),
                ("apikey", self.api_key.as_str()),
                ("r", "json"),
                ("plot", self.plot.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                // The URL carries the API key in its query string.
                let e = e.without_url();
                AttemptError::transient(Error::metadata(id, format!("request failed: {e}")), None)
            })?;

        let status = resp.status();
        debug!(movie_id = %id, status = %status, "OMDb responded");

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(AttemptError::transient(
                Error::metadata(id, format!("OMDb returned {status}")),
                retry_after,
            ));
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AttemptError::fatal(Error::metadata(
                id,
                format!("OMDb returned {status}: {body}"),
            )));
        }

        let body: OmdbResponse = resp
            .json()
            .await
            .map_err(|e| {
                let e = e.without_url();
                AttemptError::fatal(Error::metadata(id, format!("parse error: {e}")))
            })?;

        if body.response.as_deref() == Some("False") {
            debug!(
                movie_id = %id,
                reason = body.error.as_deref().unwrap_or("unknown"),
                "OMDb has no entry; using empty plot"
            );
        }

        Ok(body.into_plot())
    }
}

#[async_trait]
impl PlotSource for OmdbClient {
    async fn fetch_plot(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(Error::Validation("movie id must not be empty".into()));
        }

        let mut attempt = 0u32;
        loop {
            match self.request_plot(id).await {
                Ok(plot) => return Ok(plot),
                Err(failure) if failure.retryable && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt, failure.retry_after);
                    attempt += 1;
                    warn!(
                        movie_id = %id,
                        retry = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.error,
                        "OMDb lookup failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> MetadataConfig {
        MetadataConfig {
            omdb_api_key: Some("test-key".into()),
            base_url: format!("{}/", server.uri()),
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 5,
            requests_per_second: 0,
            ..MetadataConfig::default()
        }
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let cfg = MetadataConfig::default();
        assert!(matches!(OmdbClient::new(&cfg), Err(Error::Validation(_))));
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(0, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(350));
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_secs(60))),
            Duration::from_millis(350)
        );
    }

    #[tokio::test]
    async fn fetch_plot_sends_expected_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("i", "tt0133093"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("r", "json"))
            .and(query_param("plot", "short"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Title": "The Matrix",
                "Plot": "A computer hacker learns the truth.",
                "Response": "True"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        let plot = client.fetch_plot("tt0133093").await.unwrap();
        assert_eq!(plot, "A computer hacker learns the truth.");
    }

    #[tokio::test]
    async fn unknown_movie_yields_empty_plot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Response": "False",
                "Error": "Incorrect IMDb ID."
            })))
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        assert_eq!(client.fetch_plot("tt0000000").await.unwrap(), "");
    }

    #[tokio::test]
    async fn not_available_plot_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Plot": "N/A", "Response": "True" })),
            )
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        assert_eq!(client.fetch_plot("tt1").await.unwrap(), "");
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_plot("tt1").await.unwrap_err();
        assert!(matches!(err, Error::Metadata { .. }));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key!"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_plot("tt1").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_plot("tt1").await.unwrap_err();
        assert!(matches!(err, Error::Metadata { .. }));
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_api_key() {
        // Bind then drop a listener so the port is closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let cfg = MetadataConfig {
            omdb_api_key: Some("SECRET-KEY-123".into()),
            base_url: format!("http://{addr}/"),
            max_retries: 0,
            requests_per_second: 0,
            ..MetadataConfig::default()
        };
        let client = OmdbClient::new(&cfg).unwrap();
        let err = client.fetch_plot("tt1").await.unwrap_err();

        assert!(matches!(err, Error::Metadata { .. }));
        assert!(!err.to_string().contains("SECRET-KEY-123"), "{err}");
    }

    #[tokio::test]
    async fn parse_errors_do_not_expose_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_plot("tt1").await.unwrap_err();
        assert!(!err.to_string().contains("test-key"), "{err}");
    }

    #[tokio::test]
    async fn rate_limited_response_is_retried_after_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Plot": "Back again.", "Response": "True" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        assert_eq!(client.fetch_plot("tt1").await.unwrap(), "Back again.");
    }

    #[tokio::test]
    async fn limiter_paces_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "Plot": "p", "Response": "True" })),
            )
            .expect(3)
            .mount(&server)
            .await;

        let cfg = MetadataConfig {
            requests_per_second: 2,
            ..config_for(&server)
        };
        let client = OmdbClient::new(&cfg).unwrap();

        // A quota of 2/s lets two through at once; the third waits ~500ms.
        let started = std::time::Instant::now();
        for id in ["tt1", "tt2", "tt3"] {
            client.fetch_plot(id).await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn empty_id_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = OmdbClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_plot("  ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
