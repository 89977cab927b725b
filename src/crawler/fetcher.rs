//! HTTP fetcher implementation
//!
//! This module handles all network retrieval for the crawler:
//! - The `Fetcher` capability and its reqwest-backed implementation
//! - Building HTTP clients with the configured user agent string
//! - Retry with capped exponential backoff (`RetryingFetch`)
//! - Error classification into `FetchError`

use crate::config::UserAgentConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single backoff delay
const MAX_BACKOFF_MS: u64 = 10_000;

/// Base delay for the first retry
const BASE_BACKOFF_MS: u64 = 1_000;

/// A response as seen by the crawler
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers, names lower-cased
    pub headers: BTreeMap<String, String>,

    /// Response body decoded as text
    pub body: String,
}

impl FetchResponse {
    /// Returns true for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The Content-Type header value, or "" when absent
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    /// Returns true if the Content-Type announces an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type().to_ascii_lowercase().contains("text/html")
    }
}

/// Network retrieval capability
///
/// Implementations return non-success statuses as a normal response; only
/// transport failures are errors. Retrying is layered on top by
/// [`RetryingFetch`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a single URL, giving up after `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use web_harvest::config::UserAgentConfig;
/// use web_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with the configured user agent
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| classify_error(url, &e))?;

        Ok(FetchResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }
}

/// Maps a reqwest error onto the crawler's error kinds
fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transport {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Delay before retry number `attempt` (counted from 1)
///
/// `min(1000 * 2^(attempt-1), 10000)` milliseconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let ms = BASE_BACKOFF_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

/// Wraps a `Fetcher` with bounded exponential backoff
///
/// A transport error or a non-success status is retried up to `max_retries`
/// times. Each attempt is cut off after `timeout` regardless of how the
/// underlying fetcher treats it.
#[derive(Clone)]
pub struct RetryingFetch {
    fetcher: Arc<dyn Fetcher>,
    max_retries: u32,
    timeout: Duration,
}

impl RetryingFetch {
    pub fn new(fetcher: Arc<dyn Fetcher>, max_retries: u32, timeout: Duration) -> Self {
        Self {
            fetcher,
            max_retries,
            timeout,
        }
    }

    /// Fetches `url`, retrying failures
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResponse)` - A 2xx response
    /// * `Err(FetchError::Exhausted)` - Every attempt failed; carries the last error
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            let failure = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url, self.timeout)).await {
                Ok(Ok(response)) if response.is_success() => return Ok(response),
                Ok(Ok(response)) => FetchError::Status {
                    url: url.to_string(),
                    status: response.status,
                },
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout {
                    url: url.to_string(),
                },
            };

            if attempt >= self.max_retries {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    retries: self.max_retries,
                    last: Box::new(failure),
                });
            }

            attempt += 1;
            let delay = backoff_delay(attempt);
            debug!(
                "Retry {}/{} for {} in {}ms: {}",
                attempt,
                self.max_retries,
                url,
                delay.as_millis(),
                failure
            );
            tokio::time::sleep(delay).await;
        }
    }
}
