// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Sophos Central API client
//!
//! A typed, async client for the Sophos Central partner, organization and
//! tenant REST APIs.
//!
//! ## Features
//!
//! - **OAuth2 login**: client credentials against the Sophos ID service, with a
//!   shared token cache
//! - **Scope discovery**: `whoami` picks the API host and scope header
//! - **Pagination**: page-number and continuation-key paging behind one loop
//! - **Endpoint table**: every collection reachable by name, with path
//!   arguments checked before they reach a URL
//! - **Tenant hand-off**: partner logins act on behalf of any managed tenant
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sophos_central::{CentralClient, ClientConfig, Result, StringMap};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = CentralClient::connect(ClientConfig::from_env()?).await?;
//!
//!     for tenant in client.tenants().await? {
//!         let tenant_client = client.for_tenant(&tenant)?;
//!         let alerts = tenant_client.list("alerts", &[], &StringMap::new()).await?;
//!         println!("{}: {} alerts", tenant.display_name(), alerts.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CentralClient                            │
//! │  list() / fetch_one() / invoke()  →  endpoint table dispatch    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───────────────┬──────────────────┐
//! │     Auth     │             HTTP              │    Paginate      │
//! ├──────────────┼───────────────────────────────┼──────────────────┤
//! │ OAuth2 token │ Retry + backoff               │ Paginator        │
//! │ whoami scope │ Rate limit                    │ fetch_all_pages  │
//! │ Token cache  │ Status classification         │ page_stream      │
//! └──────────────┴───────────────────────────────┴──────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Client configuration
pub mod config;

/// OAuth2 login and caller identity
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Page tracking and the paged fetch loop
pub mod pagination;

/// Endpoint descriptor table
pub mod endpoints;

/// Typed records
pub mod models;

/// High-level API client
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::{IdType, Identity};
pub use client::CentralClient;
pub use config::ClientConfig;
pub use models::Tenant;
pub use pagination::{fetch_all_pages, PageFetcher, Paginator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
