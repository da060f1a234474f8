//! Page metadata types
//!
//! Sophos Central embeds page progress in an optional `pages` envelope next
//! to the record array:
//!
//! ```text
//! {
//!   "pages": { "current": 1, "size": 50, "total": 3, "items": 123, "maxSize": 100, "nextKey": "abc" },
//!   "items": [ ... ]
//! }
//! ```
//!
//! Every field under `pages` is optional, and so is `pages` itself. Endpoints
//! that are not paginated return a bare object or array.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Parsed `pages` envelope of one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Page the server says it just delivered
    pub current: Option<i64>,
    /// Page size the server applied
    pub size: Option<i64>,
    /// Total number of pages
    pub total: Option<i64>,
    /// Total number of records
    pub items: Option<i64>,
    /// Largest page size the server accepts
    pub max_size: Option<i64>,
    /// Cursor for key based continuation
    pub next_key: Option<String>,
}

impl PageInfo {
    /// Extract the `pages` envelope from a response body.
    ///
    /// Returns `Ok(None)` when the body carries no page metadata (no `pages`
    /// key, a `null` value, or a body that is not an object). Fields with the
    /// wrong type are rejected rather than coerced.
    pub fn from_body(body: &Value) -> Result<Option<Self>> {
        let Some(pages) = body.as_object().and_then(|obj| obj.get("pages")) else {
            return Ok(None);
        };

        match pages {
            Value::Null => Ok(None),
            Value::Object(map) => Self::from_map(map).map(Some),
            other => Err(Error::malformed_page(
                "pages",
                format!("expected an object, got {other}"),
            )),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            current: int_field(map, "current")?,
            size: int_field(map, "size")?,
            total: int_field(map, "total")?,
            items: int_field(map, "items")?,
            max_size: int_field(map, "maxSize")?,
            next_key: string_field(map, "nextKey")?,
        })
    }
}

/// Read an optional integer field. Floats are floored, anything non-numeric
/// is an error.
fn int_field(map: &Map<String, Value>, field: &str) -> Result<Option<i64>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(Some(f.floor() as i64))
                }
                _ => Err(Error::malformed_page(
                    field,
                    format!("number {n} is out of range"),
                )),
            }
        }
        Some(other) => Err(Error::malformed_page(
            field,
            format!("expected a number, got {other}"),
        )),
    }
}

fn string_field(map: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::malformed_page(
            field,
            format!("expected a string, got {other}"),
        )),
    }
}

/// One decoded page: its metadata plus the record payload
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    /// Page metadata, absent for single-shot endpoints
    pub pages: Option<PageInfo>,
    /// The `items` array, or the whole body when there is no `items` key
    pub data: Value,
}

impl PageResponse {
    /// Split a response body into page metadata and data
    pub fn from_body(body: Value) -> Result<Self> {
        let pages = PageInfo::from_body(&body)?;
        let data = match body {
            Value::Object(mut obj) if obj.get("items").is_some_and(|v| !v.is_null()) => {
                obj.remove("items").unwrap_or_default()
            }
            other => other,
        };
        Ok(Self { pages, data })
    }

    /// Records in page order. An array payload contributes its elements, any
    /// other payload is a single record.
    pub fn into_records(self) -> Vec<Value> {
        match self.data {
            Value::Array(items) => items,
            other => vec![other],
        }
    }
}
