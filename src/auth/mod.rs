//! Authentication module
//!
//! OAuth2 client credentials against the Sophos ID service, plus the
//! identity types returned by `whoami`.
//!
//! The `Authenticator` caches its token and is cheap to clone; clones share
//! the cache.

mod authenticator;
mod types;

pub use authenticator::{Authenticator, TOKEN_PATH};
pub use types::{ApiHosts, CachedToken, Credentials, IdType, Identity};
