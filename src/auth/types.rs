//! Auth types
//!
//! Client credentials, cached tokens and the caller identity reported by
//! `whoami`.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth2 client credentials issued in Sophos Central
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

impl Credentials {
    /// Create a new credentials pair
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Cached token with expiration
#[derive(Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now.
    ///
    /// A lifetime past the end of the representable calendar counts as no
    /// expiry; one before its start counts as already expired.
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let now = Utc::now();
        let expires_at = match chrono::Duration::try_seconds(seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
        {
            Some(at) => Some(at),
            None if seconds < 0 => Some(now),
            None => None,
        };
        Self { token, expires_at }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of principal the credentials belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    /// Partner managing many tenants
    Partner,
    /// Enterprise organization managing many tenants
    Organization,
    /// Single tenant
    Tenant,
}

impl IdType {
    /// Header that scopes requests to this principal
    pub fn header_name(self) -> &'static str {
        match self {
            IdType::Partner => "X-Partner-ID",
            IdType::Organization => "X-Organization-ID",
            IdType::Tenant => "X-Tenant-ID",
        }
    }

    /// Lowercase name as used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            IdType::Partner => "partner",
            IdType::Organization => "organization",
            IdType::Tenant => "tenant",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API hosts a principal may talk to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHosts {
    /// Global host (partner and organization APIs)
    #[serde(default)]
    pub global: Option<String>,
    /// Regional host holding a tenant's data
    #[serde(default)]
    pub data_region: Option<String>,
}

/// Response of `GET /whoami/v1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Partner, organization or tenant ID
    pub id: String,
    /// Kind of principal
    pub id_type: IdType,
    /// Hosts to use for subsequent calls
    #[serde(default)]
    pub api_hosts: ApiHosts,
}

impl Identity {
    /// Base URL for API calls made as this principal
    pub fn base_url(&self) -> Result<&str> {
        let host = match self.id_type {
            IdType::Partner | IdType::Organization => self.api_hosts.global.as_deref(),
            IdType::Tenant => self.api_hosts.data_region.as_deref(),
        };
        host.filter(|h| !h.is_empty()).ok_or_else(|| {
            Error::auth(format!(
                "No API host returned for {} {}",
                self.id_type, self.id
            ))
        })
    }
}
