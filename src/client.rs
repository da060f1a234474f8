//! Sophos Central client
//!
//! [`CentralClient`] ties the pieces together: it logs in, asks `whoami` who
//! the credentials belong to, picks the API host and scope header that go
//! with that identity, and then serves every endpoint in
//! [`ENDPOINTS`](crate::endpoints::ENDPOINTS) through one generic dispatch.
//!
//! ```rust,ignore
//! let client = CentralClient::connect(ClientConfig::from_env()?).await?;
//! for tenant in client.tenants().await? {
//!     let tenant_client = client.for_tenant(&tenant)?;
//!     let alerts = tenant_client.list("alerts", &[], &StringMap::new()).await?;
//! }
//! ```

use crate::auth::{ApiHosts, Authenticator, IdType, Identity};
use crate::config::ClientConfig;
use crate::endpoints::{self, Access, EndpointDescriptor};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RateLimiter};
use crate::models::Tenant;
use crate::pagination::{fetch_all_pages, page_stream, PageResponse};
use crate::types::StringMap;
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Path of the identity endpoint on the global host
pub const WHOAMI_PATH: &str = "/whoami/v1";

/// Client scoped to one partner, organization or tenant
#[derive(Debug)]
pub struct CentralClient {
    config: Arc<ClientConfig>,
    identity: Identity,
    authenticator: Authenticator,
    http: HttpClient,
}

impl CentralClient {
    /// Log in and discover the caller's identity.
    ///
    /// Fails with [`Error::MissingConfigField`] before any network traffic when
    /// the credentials are not configured.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let auth_http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;
        let authenticator = Authenticator::from_config(&config, auth_http)?;
        authenticator.access_token().await?;

        let whoami_http = HttpClient::with_auth(
            config.http_config(&config.endpoint).build(),
            authenticator.clone(),
        )?;
        let body: Value = whoami_http.get_json(WHOAMI_PATH, &StringMap::new()).await?;
        let identity: Identity = serde_json::from_value(body)
            .map_err(|e| Error::auth(format!("Unexpected whoami response: {e}")))?;

        let client = Self::scoped(
            Arc::new(config),
            authenticator,
            identity,
            whoami_http.rate_limiter(),
        )?;
        info!(
            id_type = %client.identity.id_type,
            id = %client.identity.id,
            base_url = %client.base_url(),
            "Connected to Sophos Central"
        );
        Ok(client)
    }

    /// Build a client for a known identity without calling `whoami`
    pub fn from_parts(
        config: impl Into<Arc<ClientConfig>>,
        authenticator: Authenticator,
        identity: Identity,
    ) -> Result<Self> {
        Self::scoped(config.into(), authenticator, identity, None)
    }

    /// Client for `identity`, drawing from `limiter` when one is given
    fn scoped(
        config: Arc<ClientConfig>,
        authenticator: Authenticator,
        identity: Identity,
        limiter: Option<&RateLimiter>,
    ) -> Result<Self> {
        let http_config = config
            .http_config(identity.base_url()?)
            .header(identity.id_type.header_name(), identity.id.clone())
            .build();
        let mut http = HttpClient::with_auth(http_config, authenticator.clone())?;
        if let Some(limiter) = limiter {
            http = http.share_rate_limiter(limiter);
        }

        Ok(Self {
            config,
            identity,
            authenticator,
            http,
        })
    }

    /// Identity the client acts as
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Kind of principal the client acts as
    pub fn id_type(&self) -> IdType {
        self.identity.id_type
    }

    /// Host every request goes to
    pub fn base_url(&self) -> &str {
        self.http.config().base_url.as_deref().unwrap_or_default()
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Single GET returning the parsed body
    pub async fn get(&self, path: &str, params: &StringMap) -> Result<Value> {
        self.http.get_json(path, params).await
    }

    /// Every record of a paged collection
    pub async fn get_paged(&self, path: &str, params: &StringMap) -> Result<Vec<Value>> {
        fetch_all_pages(&self.http.pages(path), params, self.config.page_size()).await
    }

    /// Records of a paged collection, one page at a time
    pub fn stream_paged<'a>(
        &'a self,
        path: &str,
        params: StringMap,
    ) -> impl Stream<Item = Result<Vec<Value>>> + 'a {
        page_stream(self.http.pages(path), params, self.config.page_size())
    }

    /// Look up an endpoint by name and check this client may call it
    pub fn resolve(&self, name: &str) -> Result<(&'static EndpointDescriptor, Access)> {
        let (descriptor, access) = endpoints::find(name)?;
        if !descriptor.api.is_available_to(self.identity.id_type) {
            return Err(Error::UnsupportedEndpoint {
                name: name.to_string(),
                scope: self.identity.id_type.to_string(),
            });
        }
        Ok((descriptor, access))
    }

    /// All records of a collection.
    ///
    /// Paged collections are fetched page by page; the rest are a single GET
    /// whose `items` (or whole body) become the records.
    pub async fn list(&self, name: &str, args: &[&str], params: &StringMap) -> Result<Vec<Value>> {
        let (descriptor, _) = self.resolve(name)?;
        let path = descriptor.render_path(args)?;
        debug!(endpoint = descriptor.name, %path, paged = descriptor.paged, "Listing");

        if descriptor.paged {
            self.get_paged(&path, params).await
        } else {
            let body = self.get(&path, params).await?;
            Ok(PageResponse::from_body(body)?.into_records())
        }
    }

    /// One item of a collection by ID
    pub async fn fetch_one(&self, name: &str, args: &[&str], id: &str) -> Result<Value> {
        let (descriptor, _) = self.resolve(name)?;
        let path = descriptor.render_item_path(args, id)?;
        debug!(endpoint = descriptor.name, %path, "Fetching item");
        self.get(&path, &StringMap::new()).await
    }

    /// Call any endpoint by collection or single-item name.
    ///
    /// For a single-item name the last argument is the item ID. Paged
    /// collections come back as one array; everything else is the response
    /// body as sent.
    pub async fn invoke(&self, name: &str, args: &[&str], params: &StringMap) -> Result<Value> {
        let (descriptor, access) = self.resolve(name)?;
        match access {
            Access::Item => {
                let Some((id, path_args)) = args.split_last() else {
                    return Err(Error::path_argument(name, "missing item id"));
                };
                let path = descriptor.render_item_path(path_args, id)?;
                self.get(&path, params).await
            }
            Access::Collection if descriptor.paged => {
                let path = descriptor.render_path(args)?;
                Ok(Value::Array(self.get_paged(&path, params).await?))
            }
            Access::Collection => {
                let path = descriptor.render_path(args)?;
                self.get(&path, params).await
            }
        }
    }

    /// Tenants managed by this partner or organization
    pub async fn tenants(&self) -> Result<Vec<Tenant>> {
        self.list(endpoints::TENANTS.name, &[], &StringMap::new())
            .await?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(Error::from))
            .collect()
    }

    /// One tenant by ID
    pub async fn tenant(&self, id: &str) -> Result<Tenant> {
        let singular = endpoints::TENANTS.singular.unwrap_or("tenant");
        let record = self.fetch_one(singular, &[], id).await?;
        Ok(serde_json::from_value(record)?)
    }

    /// Client acting on behalf of a tenant, on the tenant's own API host.
    ///
    /// Shares this client's login and rate limiter, so no new token is
    /// requested and both clients draw from one request budget.
    pub fn for_tenant(&self, tenant: &Tenant) -> Result<Self> {
        let api_host = tenant.api_host.as_deref().ok_or_else(|| {
            Error::invalid_value("apiHost", format!("tenant {} has no API host", tenant.id))
        })?;
        self.for_tenant_id(&tenant.id, api_host)
    }

    /// Client acting on behalf of a tenant given its ID and API host
    pub fn for_tenant_id(&self, tenant_id: &str, api_host: &str) -> Result<Self> {
        Url::parse(api_host)?;
        let identity = Identity {
            id: tenant_id.to_string(),
            id_type: IdType::Tenant,
            api_hosts: ApiHosts {
                global: None,
                data_region: Some(api_host.to_string()),
            },
        };
        debug!(tenant_id, api_host, "Switching to tenant scope");
        Self::scoped(
            Arc::clone(&self.config),
            self.authenticator.clone(),
            identity,
            self.http.rate_limiter(),
        )
    }
}
