//! # upwork-oauth
//!
//! OAuth 2.0 authorization-code client for the Upwork API.
//!
//! Exchanges an authorization code for an access/refresh token pair,
//! persists the tokens in the `[upwork]` section of a TOML config file,
//! refreshes them when they expire, and issues authenticated reads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use upwork_oauth::{FileConfigStore, TokenManager, UpworkClient};
//!
//! #[tokio::main]
//! async fn main() -> upwork_oauth::Result<()> {
//!     let store = Arc::new(FileConfigStore::new("upwork.toml"));
//!     let manager = Arc::new(TokenManager::from_store(store)?);
//!     let client = UpworkClient::from_manager(manager);
//!
//!     let jobs = client.search_jobs("Rust").await?;
//!     println!("{jobs:#}");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod net;
pub mod oauth;
pub mod store;

// Re-exports for ergonomic usage
pub use api::UpworkClient;
pub use config::{Credentials, Endpoints, Settings};
pub use error::{Error, Result};
pub use oauth::{TokenLifecycle, TokenManager, TokenProvider, TokenState, TokenStatus};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
