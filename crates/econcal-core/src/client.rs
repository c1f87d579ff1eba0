//! Calendar page fetching
//!
//! The [`Fetcher`] trait is the seam between the extraction engine and
//! whatever retrieves the page. [`CalendarClient`] is the plain-HTTP
//! implementation: rate limited, with exponential backoff on 429 and 5xx.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{CalendarError, Result};
use crate::types::DateRange;

/// Default calendar host
pub const DEFAULT_BASE_URL: &str = "https://tradingeconomics.com";

/// Default User-Agent mimicking a modern browser
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Retrieves calendar markup for a date range.
///
/// Implementations own cancellation and timeouts. A browser-backed fetcher
/// must release its browser session on every return path.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Address the page for `range` is fetched from
    ///
    /// Dates are opaque to the core. [`CalendarClient`] percent-encodes them
    /// into the query string instead of interpolating them raw; plain dates
    /// come through unchanged.
    fn source_url(&self, range: &DateRange) -> String;

    /// Fetch the raw page markup for `range`
    async fn fetch(&self, range: &DateRange) -> Result<String>;
}

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// Non-positive rates disable limiting.
    ///
    /// # Example
    /// ```
    /// use econcal_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(2.0);
    /// assert_eq!(limiter.min_interval().as_millis(), 500);
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until the next request is allowed
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Configuration for the calendar HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host of the calendar site, without trailing slash
    pub base_url: String,
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Retries on 429/5xx before giving up (default: 3)
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry (default: 1000)
    pub retry_base_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: 2.0,
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

/// HTTP fetcher for the calendar page
pub struct CalendarClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    config: ClientConfig,
}

impl CalendarClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// `CalendarError::InvalidUrl` for a base URL without http(s) scheme,
    /// `CalendarError::HttpError` if the HTTP client cannot be created
    pub fn with_config(mut config: ClientConfig) -> Result<Self> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(CalendarError::InvalidUrl(config.base_url));
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));

        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            config,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch `url`, retrying transient upstream failures
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut attempt = 0;

        loop {
            self.rate_limiter.acquire().await;

            debug!(url, attempt, "Fetching calendar page");
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.config.max_retries {
                let delay = self.calculate_backoff_delay(attempt);
                warn!(url, status = status.as_u16(), ?delay, "Upstream error, retrying");
                sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(CalendarError::RateLimited);
            }

            return Err(CalendarError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
    }

    /// Calculate exponential backoff delay for retry
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .retry_base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
impl Fetcher for CalendarClient {
    fn source_url(&self, range: &DateRange) -> String {
        format!(
            "{}/calendar?start={}&end={}",
            self.config.base_url,
            urlencoding::encode(&range.start),
            urlencoding::encode(&range.end)
        )
    }

    async fn fetch(&self, range: &DateRange) -> Result<String> {
        let url = self.source_url(range);
        self.fetch_with_retry(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(Some(start), Some(end)).unwrap()
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(2.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limiter_different_rates() {
        assert_eq!(RateLimiter::new(1.0).min_interval(), Duration::from_secs(1));
        assert_eq!(RateLimiter::new(4.0).min_interval(), Duration::from_millis(250));
        assert_eq!(RateLimiter::new(0.0).min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.requests_per_second, 2.0);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_client_creation() {
        assert!(CalendarClient::new().is_ok());
    }

    #[test]
    fn test_client_rejects_base_url_without_scheme() {
        let config = ClientConfig {
            base_url: "tradingeconomics.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            CalendarClient::with_config(config),
            Err(CalendarError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_source_url() {
        let client = CalendarClient::new().unwrap();
        assert_eq!(
            client.source_url(&range("2024-01-01", "2024-01-07")),
            "https://tradingeconomics.com/calendar?start=2024-01-01&end=2024-01-07"
        );
    }

    #[test]
    fn test_source_url_trims_trailing_slash_and_encodes() {
        let config = ClientConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..ClientConfig::default()
        };
        let client = CalendarClient::with_config(config).unwrap();
        assert_eq!(
            client.source_url(&range("2024-01-01", "next week")),
            "http://localhost:9000/calendar?start=2024-01-01&end=next%20week"
        );
    }

    #[test]
    fn test_backoff_delay_calculation() {
        let client = CalendarClient::new().unwrap();

        assert_eq!(client.calculate_backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(client.calculate_backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(client.calculate_backoff_delay(2), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_rate_limiter_acquire() {
        let limiter = RateLimiter::new(10.0);

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(100));
    }
}
