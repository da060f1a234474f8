//! Authenticated GET transport
//!
//! Every Central call is a GET with a query string, a bearer token and a
//! scope header. [`HttpClient`] owns that shape and the policy around it:
//! client-side throttling, retries of transient failures, one token refresh
//! when the API rejects a cached token, and turning non-2xx responses into
//! [`Error::HttpStatus`].

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::pagination::PageFetcher;
use crate::types::{BackoffType, StringMap};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any retry delay
    pub max_backoff: Duration,
    /// How the delay grows between retries
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers sent with every request
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: StringMap::new(),
            user_agent: format!("sophos-central-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff strategy, first delay and cap
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set or clear the rate limiter
    pub fn rate_limit(mut self, config: Option<RateLimiterConfig>) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Add a header sent with every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Result of one GET attempt
enum Attempt {
    Done(Response),
    /// Transient failure; `after` is the server's requested wait, if any
    Retry {
        after: Option<Duration>,
        error: Error,
    },
    Fail(Error),
}

/// GET client for one API host
pub struct HttpClient {
    inner: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create an unauthenticated client
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let inner = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            inner,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Create a client that sends a bearer token with every request
    pub fn with_auth(config: HttpClientConfig, authenticator: Authenticator) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.authenticator = Some(authenticator);
        Ok(client)
    }

    /// Draw from an existing limiter instead of this client's own.
    ///
    /// Has no effect on a client built without a rate limit.
    #[must_use]
    pub fn share_rate_limiter(mut self, limiter: &RateLimiter) -> Self {
        if self.rate_limiter.is_some() {
            self.rate_limiter = Some(limiter.clone());
        }
        self
    }

    /// Client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Limiter every request waits on, if rate limiting is enabled
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// GET `path` with `query` and parse the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &StringMap) -> Result<T> {
        let response = self.send(path, query).await?;
        Ok(response.json().await?)
    }

    /// Page source for a collection at `path`
    pub fn pages(&self, path: impl Into<String>) -> ResourcePages<'_> {
        ResourcePages {
            client: self,
            path: path.into(),
        }
    }

    async fn send(&self, path: &str, query: &StringMap) -> Result<Response> {
        let url = self.url_for(path);
        let mut retries = 0;
        let mut token_refreshed = false;

        loop {
            self.throttle().await;
            let attempt = match self.prepare(&url, query).await?.send().await {
                Ok(response) => classify_response(response).await,
                Err(e) => self.classify_transport_error(e),
            };

            match attempt {
                Attempt::Done(response) => {
                    debug!(%url, status = response.status().as_u16(), "GET");
                    return Ok(response);
                }
                Attempt::Fail(error) => {
                    // A token can be revoked server side while still fresh in the cache
                    if let (Some(auth), Some(401), false) =
                        (&self.authenticator, error.status(), token_refreshed)
                    {
                        warn!(%url, "Token rejected, requesting a new one");
                        auth.clear_cache().await;
                        token_refreshed = true;
                        continue;
                    }
                    return Err(error);
                }
                Attempt::Retry { after, error } => {
                    if retries >= self.config.max_retries {
                        return Err(error);
                    }
                    let delay = after.unwrap_or_else(|| self.backoff_delay(retries));
                    retries += 1;
                    warn!(
                        %url,
                        retry = retries,
                        max_retries = self.config.max_retries,
                        ?delay,
                        %error,
                        "Retrying GET"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn prepare(&self, url: &str, query: &StringMap) -> Result<RequestBuilder> {
        let mut req = self.inner.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }
        for (name, value) in &self.config.default_headers {
            req = req.header(name.as_str(), value.as_str());
        }
        match &self.authenticator {
            Some(auth) => auth.apply(req).await,
            None => Ok(req),
        }
    }

    async fn throttle(&self) {
        let Some(limiter) = &self.rate_limiter else {
            return;
        };
        if !limiter.try_acquire() {
            debug!("Client-side rate limit reached, waiting");
            limiter.wait().await;
        }
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> Attempt {
        if e.is_timeout() {
            let timeout_ms = self.config.timeout.as_millis() as u64;
            return Attempt::Retry {
                after: None,
                error: Error::Timeout { timeout_ms },
            };
        }
        if e.is_connect() {
            return Attempt::Retry {
                after: None,
                error: Error::Http(e),
            };
        }
        Attempt::Fail(Error::Http(e))
    }

    /// Absolute URLs pass through; anything else is joined to the base URL
    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Delay before retry number `retry + 1`, capped at `max_backoff`
    pub(crate) fn backoff_delay(&self, retry: u32) -> Duration {
        let first = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => first,
            BackoffType::Linear => first.saturating_mul(retry.saturating_add(1)),
            BackoffType::Exponential => first.saturating_mul(2u32.saturating_pow(retry)),
        };
        delay.min(self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Sort a response into success, transient failure or hard failure
async fn classify_response(response: Response) -> Attempt {
    let status = response.status();
    if status.is_success() {
        return Attempt::Done(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let wait = retry_after(&response);
        return Attempt::Retry {
            after: wait,
            error: Error::RateLimited {
                retry_after_seconds: wait.map_or(0, |d| d.as_secs()),
            },
        };
    }

    let body = response.text().await.unwrap_or_default();
    let error = Error::http_status(status.as_u16(), body);
    if error.is_retryable() {
        Attempt::Retry { after: None, error }
    } else {
        Attempt::Fail(error)
    }
}

/// Wait requested by a `Retry-After` header given in seconds
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// A paginated collection reachable through an [`HttpClient`]
#[derive(Debug)]
pub struct ResourcePages<'a> {
    client: &'a HttpClient,
    path: String,
}

#[async_trait]
impl PageFetcher for ResourcePages<'_> {
    async fn fetch_page(&self, query: &StringMap) -> Result<Value> {
        self.client.get_json(&self.path, query).await
    }
}
