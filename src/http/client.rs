//! API transport and the retrying fetch loop
//!
//! [`ApiClient`] owns the single "send one logical request, retrying as
//! needed" contract used by everything above it. One physical GET at a
//! time; pacing happens after each response so the first request after
//! limiter initialization is never itself throttled.

use super::rate_limit::SharedRateLimiter;
use super::retry::{classify, RetryDecision};
use crate::auth;
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Connection and read timeout, matching the API's long-poll worst case
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(300);

/// Seam between pagination and the transport, so sequences can be driven
/// from canned pages in tests.
///
/// `Ok(None)` is the benign-empty sentinel: the resource has no more
/// records and the sequence should end without error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page body, retrying transient failures internally.
    async fn fetch_page(&self, url: &str) -> Result<Option<String>>;
}

/// Authenticated HTTP client with rate limiting and bounded retry
pub struct ApiClient {
    client: Client,
    config: ConnectorConfig,
    rate_limiter: SharedRateLimiter,
}

impl ApiClient {
    /// Create a client for the configured tenant
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .connect_timeout(CONNECTION_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limiter: SharedRateLimiter::new(),
        })
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// The shared request pacer
    pub fn rate_limiter(&self) -> &SharedRateLimiter {
        &self.rate_limiter
    }

    /// Issue one GET without retrying.
    ///
    /// Returns the raw body text on 200. Any other status becomes
    /// [`Error::Api`] carrying the status, an `{error, description}`
    /// summary from the body, and the `Retry-After` delay when the server
    /// provided one for 429/500/503. A request that produced no response
    /// at all is reported with status -1.
    pub async fn send_once(&self, url: &str) -> Result<String> {
        let mut request = self.client.get(url);
        for (name, value) in auth::request_headers(&self.config) {
            request = request.header(name, value);
        }

        log_request_line(url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(Error::api(-1, e.to_string())),
        };

        // Post-request pacing: derive the quota from this response if it is
        // the first one, then consume a permit before anyone sends again.
        self.rate_limiter.initialize_from(response.headers())?;
        self.rate_limiter.acquire().await;

        let status = response.status();
        if status != StatusCode::OK {
            let retry_after = if matches!(status.as_u16(), 429 | 500 | 503) {
                extract_retry_after(response.headers())
            } else {
                None
            };
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: i32::from(status.as_u16()),
                message: extract_error_messages(&body)?,
                retry_after,
            });
        }

        Ok(response.text().await?)
    }

    /// Send one logical request, retrying transient failures with bounded
    /// backoff.
    ///
    /// `Ok(None)` signals a benign-empty response (no more records). Fatal
    /// classifications surface as configuration errors; an exhausted retry
    /// budget surfaces as [`Error::GiveUp`] wrapping the last failure.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Option<String>> {
        let retry_limit = self.config.retry_limit;
        let mut attempt: u32 = 0;

        loop {
            let api_error = match self.send_once(url).await {
                Ok(body) => return Ok(Some(body)),
                Err(Error::Api {
                    status,
                    message,
                    retry_after,
                }) => (status, message, retry_after),
                Err(other) => return Err(other),
            };
            let (status, message, retry_after) = api_error;

            match classify(status, &message, retry_after) {
                RetryDecision::BenignEmpty => return Ok(None),
                RetryDecision::Fatal(reason) => return Err(Error::config(reason)),
                RetryDecision::Retry => {
                    if attempt >= retry_limit {
                        warn!("Unable to complete the request");
                        return Err(Error::GiveUp {
                            retries: retry_limit,
                            message: format!("status {status}: {message}"),
                        });
                    }
                    attempt += 1;
                    let wait = self.retry_wait(attempt, retry_after);
                    warn!(
                        "Retrying '{}'/'{}' after '{}' seconds. HTTP status code: '{}'",
                        attempt,
                        retry_limit,
                        wait.as_secs(),
                        status
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Sleep before the given retry attempt (1-based): exponential backoff
    /// capped at the configured max, stretched to any server-advised
    /// retry-after delay.
    fn retry_wait(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .config
            .retry_initial_wait_sec
            .saturating_mul(1 << exponent)
            .min(self.config.max_retry_wait_sec);

        let seconds = match retry_after {
            Some(advised) if advised > backoff => advised,
            _ => backoff,
        };
        Duration::from_secs(seconds)
    }
}

#[async_trait]
impl PageFetcher for ApiClient {
    async fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        self.fetch_with_retry(url).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("login_url", &self.config.login_url)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Log the request line without the host or credentials
fn log_request_line(url: &str) {
    if let Ok(parsed) = Url::parse(url) {
        match parsed.query() {
            Some(query) => info!(">>> GET {}?{}", parsed.path(), query),
            None => info!(">>> GET {}", parsed.path()),
        }
    }
}

/// Extract an `{error, description}` summary from a JSON error body.
///
/// A body that is not JSON at all is unexpected and propagates as a fatal
/// decode error rather than being swallowed.
fn extract_error_messages(body: &str) -> Result<String> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| Error::decode(format!("unreadable error body: {e}")))?;

    let mut summary = serde_json::Map::new();
    for field in ["error", "description"] {
        if let Some(value) = parsed.get(field) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            summary.insert(field.to_string(), Value::String(text));
        }
    }
    Ok(Value::Object(summary).to_string())
}

/// Retry-After header value in integer seconds
fn extract_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("Retry-After")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
