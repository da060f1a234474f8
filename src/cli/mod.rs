//! CLI module
//!
//! Command-line interface over [`CentralClient`](crate::client::CentralClient).
//!
//! # Commands
//!
//! - `whoami` - Show the identity behind the credentials
//! - `endpoints` - List callable endpoints
//! - `tenants` - List managed tenants
//! - `call` - Call any endpoint by name

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
