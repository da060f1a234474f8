//! Client configuration
//!
//! A [`ClientConfig`] is a plain immutable value handed to
//! [`CentralClient::connect`](crate::client::CentralClient::connect). Two
//! clients built from different configs never affect each other.
//!
//! Configs come from the builder, from environment variables, or from a
//! YAML/JSON file:
//!
//! ```yaml
//! client_id: 3f2a...
//! client_secret: c0ffee...
//! page_size: 50
//! rate_limit:
//!   requests_per_second: 5
//! ```

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, HttpClientConfigBuilder, RateLimiterConfig};
use crate::types::{BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default global API host
pub const DEFAULT_ENDPOINT: &str = "https://api.central.sophos.com";

/// Default identity service host
pub const DEFAULT_ID_ENDPOINT: &str = "https://id.sophos.com";

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound on the delay between retries
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Environment variable holding the client ID
pub const ENV_CLIENT_ID: &str = "SOPHOS_CLIENT_ID";
/// Environment variable holding the client secret
pub const ENV_CLIENT_SECRET: &str = "SOPHOS_CLIENT_SECRET";
/// Environment variable overriding the API endpoint
pub const ENV_ENDPOINT: &str = "SOPHOS_ENDPOINT";
/// Environment variable overriding the identity endpoint
pub const ENV_ID_ENDPOINT: &str = "SOPHOS_ID_ENDPOINT";
/// Environment variable overriding the page size
pub const ENV_PAGE_SIZE: &str = "SOPHOS_PAGE_SIZE";

// ============================================================================
// Client Config
// ============================================================================

/// Settings for one client instance
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// OAuth2 client ID
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth2 client secret
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,

    /// API host used for identity discovery
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Identity service host issuing tokens
    #[serde(default = "default_id_endpoint")]
    pub id_endpoint: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Records requested per page (0 lets the server choose)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// How the delay grows between retries
    #[serde(default)]
    pub backoff: BackoffType,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Client side rate limit, `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_id_endpoint() -> String {
    DEFAULT_ID_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    format!("sophos-central-rs/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_rate_limit() -> Option<RateLimiterConfig> {
    Some(RateLimiterConfig::default())
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            endpoint: default_endpoint(),
            id_endpoint: default_id_endpoint(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffType::default(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit: default_rate_limit(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint", &self.endpoint)
            .field("id_endpoint", &self.id_endpoint)
            .field("user_agent", &self.user_agent)
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load settings from `SOPHOS_*` environment variables on top of the
    /// defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            client_id: lookup(ENV_CLIENT_ID).none_if_empty(),
            client_secret: lookup(ENV_CLIENT_SECRET).none_if_empty(),
            ..Self::default()
        };

        if let Some(endpoint) = lookup(ENV_ENDPOINT).none_if_empty() {
            config.endpoint = endpoint;
        }
        if let Some(id_endpoint) = lookup(ENV_ID_ENDPOINT).none_if_empty() {
            config.id_endpoint = id_endpoint;
        }
        if let Some(page_size) = lookup(ENV_PAGE_SIZE).none_if_empty() {
            config.page_size = page_size.parse().map_err(|e| {
                Error::invalid_value(ENV_PAGE_SIZE, format!("'{page_size}': {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load settings from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse settings from YAML (JSON is accepted as well)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both endpoints are absolute http(s) URLs
    pub fn validate(&self) -> Result<()> {
        validate_url("endpoint", &self.endpoint)?;
        validate_url("id_endpoint", &self.id_endpoint)?;
        Ok(())
    }

    /// Page size as handed to the paginator
    pub fn page_size(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// HTTP settings for a client talking to `base_url`, open for
    /// per-scope headers
    pub fn http_config(&self, base_url: &str) -> HttpClientConfigBuilder {
        HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(self.timeout())
            .max_retries(self.max_retries)
            .backoff(
                self.backoff,
                Duration::from_millis(self.retry_delay_ms),
                MAX_RETRY_DELAY,
            )
            .rate_limit(self.rate_limit.clone())
            .user_agent(self.user_agent.clone())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| Error::invalid_value(field, format!("'{value}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::invalid_value(
            field,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set client ID and secret
    pub fn credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self.config.client_secret = Some(client_secret.into());
        self
    }

    /// Set the client ID
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Set the client secret
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.client_secret = Some(client_secret.into());
        self
    }

    /// Set the API endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the identity endpoint
    pub fn id_endpoint(mut self, id_endpoint: impl Into<String>) -> Self {
        self.config.id_endpoint = id_endpoint.into();
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the page size
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the retry backoff strategy and first delay
    pub fn backoff(mut self, backoff: BackoffType, first_delay: Duration) -> Self {
        self.config.backoff = backoff;
        self.config.retry_delay_ms = first_delay.as_millis() as u64;
        self
    }

    /// Set or clear the rate limit
    pub fn rate_limit(mut self, rate_limit: Option<RateLimiterConfig>) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
