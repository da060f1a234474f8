//! Page progress tracker
//!
//! The Central APIs mix two pagination styles: page-number based (`page`,
//! `pageSize`) and key based (`pageFromKey`). A [`Paginator`] does not know
//! in advance which one an endpoint uses. It always sends the page number and
//! adds the continuation key once the server has handed one out.

use super::types::PageInfo;
use crate::error::Result;
use crate::types::StringMap;
use serde_json::Value;

/// Query parameter carrying the 1-based page number
pub const PAGE_PARAM: &str = "page";
/// Query parameter carrying the requested page size
pub const PAGE_SIZE_PARAM: &str = "pageSize";
/// Query parameter asking the server to report the total page count
pub const PAGE_TOTAL_PARAM: &str = "pageTotal";
/// Query parameter carrying the continuation key
pub const PAGE_FROM_KEY_PARAM: &str = "pageFromKey";

/// Tracks page progress for one paged fetch.
///
/// Created fresh for every collection fetch and never shared. `total_pages`
/// starts at 1 so the first page is always requested; it drops to 0 when a
/// response turns out to carry no page metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page_size: i64,
    current_page: i64,
    total_pages: i64,
    continuation_key: Option<String>,
}

impl Paginator {
    /// Create a paginator for the given page size.
    ///
    /// Zero and negative sizes are passed through untouched; the server
    /// decides what they mean.
    pub fn new(page_size: i64) -> Self {
        Self {
            page_size,
            current_page: 1,
            total_pages: 1,
            continuation_key: None,
        }
    }

    /// Requested page size
    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Next page to request (1-based)
    pub fn current_page(&self) -> i64 {
        self.current_page
    }

    /// Upper bound on pages as last reported by the server
    pub fn total_pages(&self) -> i64 {
        self.total_pages
    }

    /// Last continuation key seen, if any
    pub fn continuation_key(&self) -> Option<&str> {
        self.continuation_key.as_deref()
    }

    /// Query parameters for the next page request
    pub fn page_request_parameters(&self) -> StringMap {
        let mut params = StringMap::new();
        params.insert(PAGE_PARAM.to_string(), self.current_page.to_string());
        params.insert(PAGE_SIZE_PARAM.to_string(), self.page_size.to_string());
        params.insert(PAGE_TOTAL_PARAM.to_string(), "true".to_string());

        if self.current_page > 1 {
            if let Some(key) = &self.continuation_key {
                params.insert(PAGE_FROM_KEY_PARAM.to_string(), key.clone());
            }
        }
        params
    }

    /// Update state from a response body.
    ///
    /// Fails on malformed page metadata and leaves the state untouched.
    pub fn advance(&mut self, body: &Value) -> Result<()> {
        let pages = PageInfo::from_body(body)?;
        self.apply(pages.as_ref());
        Ok(())
    }

    /// Update state from already parsed page metadata
    pub fn apply(&mut self, pages: Option<&PageInfo>) {
        let Some(pages) = pages else {
            // No envelope: the endpoint returned everything in one response.
            self.total_pages = 0;
            return;
        };

        if let Some(total) = pages.total {
            self.total_pages = total;
        }

        let next = self.current_page.saturating_add(1);
        self.current_page = match pages.current {
            Some(current) => next.max(current.saturating_add(1)),
            None => next,
        };

        // Sticky: a missing or empty key keeps the previous one.
        if let Some(key) = pages.next_key.as_deref().filter(|k| !k.is_empty()) {
            self.continuation_key = Some(key.to_string());
        }
    }

    /// Whether another page should be fetched
    pub fn has_more_pages(&self) -> bool {
        self.current_page <= self.total_pages
    }

    /// Record payload of a response body: its `items` field when present and
    /// not null, otherwise the body itself
    pub fn extract_items(body: &Value) -> &Value {
        match body.get("items") {
            Some(items) if !items.is_null() => items,
            _ => body,
        }
    }
}
