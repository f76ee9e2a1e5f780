//! Transport shared by the token endpoint and the API calls.

use reqwest::Client;
use reqwest::redirect::Policy;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("upwork-oauth/", env!("CARGO_PKG_VERSION"));

/// Build the `reqwest` client used by [`TokenManager`](crate::TokenManager)
/// and [`UpworkClient`](crate::UpworkClient).
///
/// Redirects are not followed, so a bearer token never reaches another
/// host. Timeouts are reqwest's own.
pub fn build_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        })
}
