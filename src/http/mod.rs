//! HTTP client module
//!
//! The transport under every Central API call.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Authentication**: Bearer token from the shared authenticator, refreshed
//!   once when the API rejects it
//! - **Paging**: [`ResourcePages`] exposes a collection as a page source

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, ResourcePages};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
