//! Pagination module
//!
//! Supports the two Central pagination styles (page number and continuation
//! key) plus single-shot endpoints that return everything at once.
//!
//! # Overview
//!
//! - [`Paginator`] tracks page progress and builds page query parameters
//! - [`PageInfo`] / [`PageResponse`] decode the `pages` envelope
//! - [`fetch_all_pages`] drives the loop against any [`PageFetcher`]

mod fetch;
mod paginator;
mod types;

pub use fetch::{fetch_all_pages, merge_params, page_stream, PageFetcher};
pub use paginator::{
    Paginator, PAGE_FROM_KEY_PARAM, PAGE_PARAM, PAGE_SIZE_PARAM, PAGE_TOTAL_PARAM,
};
pub use types::{PageInfo, PageResponse};
