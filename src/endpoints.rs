//! Endpoint descriptor table
//!
//! Every collection and resource the client can reach is one row in
//! [`ENDPOINTS`]. The client has a single generic dispatch path that reads a
//! descriptor and decides between a paged fetch and a plain GET, so adding an
//! endpoint is a one-line change here.
//!
//! Path templates use `{name}` placeholders, filled positionally:
//!
//! ```text
//! /endpoint/v1/endpoint-groups/{group_id}/endpoints  +  ["0a1b..."]
//! ```

use crate::auth::IdType;
use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Placeholder in a path template: `{group_id}`
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"));

/// Characters allowed in a path argument (RFC 3986 unreserved)
static PATH_ARG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~-]+$").expect("path argument regex is valid"));

/// API family an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Api {
    /// Alerts and directory (tenant scoped)
    Common,
    /// Endpoint protection (tenant scoped)
    Endpoint,
    /// Partner and organization administration
    Partner,
}

impl Api {
    /// Whether a client scoped to `id_type` may call this API
    pub fn is_available_to(self, id_type: IdType) -> bool {
        match self {
            Api::Common | Api::Endpoint => id_type == IdType::Tenant,
            Api::Partner => matches!(id_type, IdType::Partner | IdType::Organization),
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Api::Common => "common",
            Api::Endpoint => "endpoint",
            Api::Partner => "partner",
        })
    }
}

/// One reachable collection or resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointDescriptor {
    /// Name of the collection accessor, e.g. `tenants`
    pub name: &'static str,
    /// API family
    pub api: Api,
    /// Path template
    pub path: &'static str,
    /// Whether the collection is paginated
    pub paged: bool,
    /// Name of the single-item accessor, e.g. `tenant`
    pub singular: Option<&'static str>,
}

impl EndpointDescriptor {
    const fn paged(name: &'static str, api: Api, path: &'static str) -> Self {
        Self {
            name,
            api,
            path,
            paged: true,
            singular: None,
        }
    }

    const fn plain(name: &'static str, api: Api, path: &'static str) -> Self {
        Self {
            name,
            api,
            path,
            paged: false,
            singular: None,
        }
    }

    const fn with_singular(mut self, singular: &'static str) -> Self {
        self.singular = Some(singular);
        self
    }

    /// Placeholder names in template order
    pub fn placeholders(&self) -> Vec<&'static str> {
        PLACEHOLDER_REGEX
            .captures_iter(self.path)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Fill the path template with positional arguments
    pub fn render_path(&self, args: &[&str]) -> Result<String> {
        let placeholders = self.placeholders();
        if placeholders.len() != args.len() {
            return Err(Error::path_argument(
                self.name,
                format!(
                    "expected {} argument(s) ({}), got {}",
                    placeholders.len(),
                    placeholders.join(", "),
                    args.len()
                ),
            ));
        }

        for (name, value) in placeholders.iter().zip(args) {
            validate_path_arg(self.name, name, value)?;
        }

        let mut args = args.iter();
        let rendered = PLACEHOLDER_REGEX.replace_all(self.path, |_: &regex::Captures<'_>| {
            args.next().copied().unwrap_or_default().to_string()
        });
        Ok(rendered.into_owned())
    }

    /// Path of a single item: the rendered collection path plus `/{id}`
    pub fn render_item_path(&self, args: &[&str], id: &str) -> Result<String> {
        let Some(singular) = self.singular else {
            return Err(Error::path_argument(
                self.name,
                "endpoint has no single-item form",
            ));
        };
        validate_path_arg(singular, "id", id)?;
        Ok(format!("{}/{id}", self.render_path(args)?))
    }
}

fn validate_path_arg(endpoint: &str, name: &str, value: &str) -> Result<()> {
    if PATH_ARG_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(Error::path_argument(
            endpoint,
            format!("invalid value for '{name}': {value:?}"),
        ))
    }
}

/// How a name resolved against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The collection accessor (`tenants`)
    Collection,
    /// The single-item accessor (`tenant`)
    Item,
}

/// Resolve a collection or single-item name
pub fn find(name: &str) -> Result<(&'static EndpointDescriptor, Access)> {
    let name = name.replace('-', "_");
    ENDPOINTS
        .iter()
        .find_map(|e| {
            if e.name == name {
                Some((e, Access::Collection))
            } else if e.singular == Some(name.as_str()) {
                Some((e, Access::Item))
            } else {
                None
            }
        })
        .ok_or(Error::UnknownEndpoint { name })
}

/// Descriptors available to a client of the given scope
pub fn available_to(id_type: IdType) -> impl Iterator<Item = &'static EndpointDescriptor> {
    ENDPOINTS.iter().filter(move |e| e.api.is_available_to(id_type))
}

/// Tenants managed by a partner or organization
pub const TENANTS: EndpointDescriptor =
    EndpointDescriptor::paged("tenants", Api::Partner, "/partner/v1/tenants").with_singular("tenant");

/// Every endpoint the client knows about
pub static ENDPOINTS: &[EndpointDescriptor] = &[
    // Partner
    TENANTS,
    EndpointDescriptor::paged("roles", Api::Partner, "/partner/v1/roles").with_singular("role"),
    EndpointDescriptor::paged("admins", Api::Partner, "/partner/v1/admins").with_singular("admin"),
    EndpointDescriptor::plain(
        "admin_role_assignments",
        Api::Partner,
        "/partner/v1/admins/{admin_id}/role-assignments",
    )
    .with_singular("admin_role_assignment"),
    EndpointDescriptor::plain("permission_sets", Api::Partner, "/partner/v1/roles/permission-sets"),
    EndpointDescriptor::paged(
        "billing_usage",
        Api::Partner,
        "/partner/v1/billing/usage/{year}/{month}",
    ),
    // Common
    EndpointDescriptor::paged("alerts", Api::Common, "/common/v1/alerts").with_singular("alert"),
    EndpointDescriptor::paged(
        "directory_user_groups",
        Api::Common,
        "/common/v1/directory/user-groups",
    )
    .with_singular("directory_user_group"),
    EndpointDescriptor::paged(
        "directory_user_group_users",
        Api::Common,
        "/common/v1/directory/user-groups/{group_id}/users",
    ),
    EndpointDescriptor::paged("directory_users", Api::Common, "/common/v1/directory/users")
        .with_singular("directory_user"),
    EndpointDescriptor::paged(
        "directory_user_groups_of_user",
        Api::Common,
        "/common/v1/directory/users/{user_id}/groups",
    ),
    // Endpoint
    EndpointDescriptor::paged("downloads", Api::Endpoint, "/endpoint/v1/downloads"),
    EndpointDescriptor::paged("endpoint_groups", Api::Endpoint, "/endpoint/v1/endpoint-groups")
        .with_singular("endpoint_group"),
    EndpointDescriptor::paged(
        "endpoint_group_endpoints",
        Api::Endpoint,
        "/endpoint/v1/endpoint-groups/{group_id}/endpoints",
    ),
    EndpointDescriptor::paged("migrations", Api::Endpoint, "/endpoint/v1/migrations")
        .with_singular("migration"),
    EndpointDescriptor::paged(
        "migration_endpoints",
        Api::Endpoint,
        "/endpoint/v1/migrations/{migration_id}/endpoints",
    ),
    EndpointDescriptor::paged("policies", Api::Endpoint, "/endpoint/v1/policies")
        .with_singular("policy"),
    // No singular form: it would shadow the API family name
    EndpointDescriptor::paged("endpoints", Api::Endpoint, "/endpoint/v1/endpoints"),
    EndpointDescriptor::plain(
        "endpoint_isolation",
        Api::Endpoint,
        "/endpoint/v1/endpoints/{endpoint_id}/isolation",
    ),
    EndpointDescriptor::plain(
        "endpoint_tamper_protection",
        Api::Endpoint,
        "/endpoint/v1/endpoints/{endpoint_id}/tamper-protection",
    ),
];
