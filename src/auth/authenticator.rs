//! Authenticator implementation
//!
//! Exchanges client credentials for a bearer token at the Sophos ID service
//! and keeps it cached until shortly before it expires.

use super::types::{CachedToken, Credentials};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Path of the OAuth2 token endpoint on the ID service
pub const TOKEN_PATH: &str = "/api/v2/oauth2/token";

/// Scope requested with every token
const TOKEN_SCOPE: &str = "token";

/// Applies a bearer token to outgoing requests.
///
/// Clones share one token cache, so every client derived from a login reuses
/// the same token.
#[derive(Clone)]
pub struct Authenticator {
    credentials: Credentials,
    token_url: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator for the given token endpoint
    pub fn new(credentials: Credentials, token_url: impl Into<String>) -> Self {
        Self::with_client(credentials, token_url, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(
        credentials: Credentials,
        token_url: impl Into<String>,
        http_client: Client,
    ) -> Self {
        Self {
            credentials,
            token_url: token_url.into(),
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Build an authenticator from client configuration.
    ///
    /// Fails before any network traffic when the credentials are missing.
    pub fn from_config(config: &ClientConfig, http_client: Client) -> Result<Self> {
        let client_id = config
            .client_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing_field("client_id"))?;
        let client_secret = config
            .client_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::missing_field("client_secret"))?;

        let token_url = format!("{}{}", config.id_endpoint.trim_end_matches('/'), TOKEN_PATH);
        Ok(Self::with_client(
            Credentials::new(client_id, client_secret),
            token_url,
            http_client,
        ))
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(req.bearer_auth(token))
    }

    /// Get a valid access token, fetching a new one if necessary
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_new_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Fetch a token using the client credentials grant
    async fn fetch_new_token(&self) -> Result<CachedToken> {
        debug!(token_url = %self.token_url, client_id = %self.credentials.client_id, "Requesting access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", TOKEN_SCOPE),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!("Unauthorized; response {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth2 {
                message: format!(
                    "Token request failed with status {}: {body}",
                    status.as_u16()
                ),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        let token = token_response.into_cached_token()?;
        info!(client_id = %self.credentials.client_id, "Obtained access token");
        Ok(token)
    }

    /// Drop the cached token, forcing a new exchange on the next request.
    ///
    /// Called when the API rejects a token the cache still considers valid.
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TokenResponse {
    fn into_cached_token(self) -> Result<CachedToken> {
        let token = match self.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(Error::auth(format!(
                    "Could not find valid access_token; error {} {}",
                    self.error_code.as_deref().unwrap_or("-"),
                    self.message.as_deref().unwrap_or("")
                )))
            }
        };

        Ok(match self.expires_in {
            Some(secs) => CachedToken::expires_in(token, secs),
            None => CachedToken::new(token, None),
        })
    }
}
