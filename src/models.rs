//! Typed records
//!
//! Most collections are handed back as raw JSON; the few records the client
//! itself needs to read are modeled here.

use crate::types::JsonObject;
use serde::{Deserialize, Serialize};

/// A tenant managed by a partner or organization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Tenant ID, sent as `X-Tenant-ID`
    pub id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_as: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_geography: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_region: Option<String>,
    /// `trial`, `usage` or `term`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_type: Option<String>,
    /// Regional API host for calls made on behalf of this tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Fields not modeled above
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl Tenant {
    /// Name to show a person: `showAs`, then `name`, then the ID
    pub fn display_name(&self) -> &str {
        self.show_as
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }
}
