//! Authenticated Upwork API calls.
//!
//! Every call asks its [`TokenProvider`](crate::oauth::TokenProvider) for a
//! valid token first, then issues a single GET with a bearer header.

pub mod client;

pub use client::UpworkClient;

/// Query used by `search_jobs` when the caller has no preference.
pub const DEFAULT_SEARCH_QUERY: &str = "DevOps";
