//! Upwork REST client.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::net;
use crate::oauth::{TokenManager, TokenProvider};

/// Client for the authenticated Upwork endpoints.
///
/// Holds a [`TokenProvider`] rather than a token: the provider is consulted
/// before every request, so an expired token is refreshed before the call
/// goes out.
#[derive(Clone)]
pub struct UpworkClient {
    tokens: Arc<dyn TokenProvider>,
    http_client: reqwest::Client,
    endpoints: Endpoints,
}

impl std::fmt::Debug for UpworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpworkClient")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl UpworkClient {
    /// Create a client over any token provider, with default endpoints.
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            tokens,
            http_client: net::build_client(),
            endpoints: Endpoints::default(),
        }
    }

    /// Create a client sharing the manager's endpoints and HTTP client.
    pub fn from_manager(manager: Arc<TokenManager>) -> Self {
        let endpoints = manager.endpoints().clone();
        let http_client = manager.http_client().clone();
        Self {
            tokens: manager,
            http_client,
            endpoints,
        }
    }

    /// Override the endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the HTTP client.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Search job postings. The response body is returned as-is.
    #[instrument(skip(self))]
    pub async fn search_jobs(&self, query: &str) -> Result<Value> {
        let url = self.endpoints.search_jobs_url();
        self.get_json(&url, &[("q", query)]).await
    }

    /// Fetch the authenticated client's profile. The response body is returned as-is.
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> Result<Value> {
        let url = self.endpoints.profile_url();
        self.get_json(&url, &[]).await
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        // Validate first; the request only goes out with a fresh token.
        let token = self.tokens.bearer_token().await?;

        debug!(%url, "GET");
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Upwork API request failed");
            return Err(Error::AuthProvider {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }
}
