//! Upwork OAuth 2.0 authorization code flow.
//!
//! # Key Characteristics
//! - Token request format: Form-encoded (standard OAuth)
//! - Client secret: Required on every token request
//! - No PKCE, no scopes, no state parameter
//! - Refresh responses may omit `refresh_token` (no rotation)
//!
//! # Endpoints
//! - Authorization: `https://www.upwork.com/ab/account-security/oauth2/authorize`
//! - Token: `https://www.upwork.com/api/v3/oauth2/token`

use serde::Deserialize;
use tracing::{debug, warn};

use super::token::DEFAULT_EXPIRES_IN_SECS;
use crate::config::{Credentials, Endpoints};
use crate::error::{Error, Result};

/// Build the authorization URL a human operator visits to obtain a code.
pub fn build_authorize_url(endpoints: &Endpoints, client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}",
        endpoints.auth_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
    )
}

/// Token response from Upwork's token endpoint.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Lifetime in seconds, defaulting to one hour when the provider is silent.
    pub fn expires_in_or_default(&self) -> i64 {
        self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Error document from the token endpoint, used for logging only.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// The exchange must yield a refresh token; a success body without one is
/// rejected so the manager never stores a session it cannot renew.
pub async fn exchange_code(
    http_client: &reqwest::Client,
    endpoints: &Endpoints,
    credentials: &Credentials,
    code: &str,
) -> Result<TokenResponse> {
    debug!("Exchanging authorization code for Upwork tokens");

    let form_data = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", credentials.redirect_uri.as_str()),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
    ];

    let token = post_token_form(http_client, &endpoints.token_url, &form_data, "exchange").await?;

    if token.refresh_token.as_deref().is_none_or(str::is_empty) {
        return Err(Error::InvalidResponse(
            "No refresh token in authorization code response".to_string(),
        ));
    }

    debug!("Upwork token exchange successful");
    Ok(token)
}

/// Refresh the Upwork access token.
///
/// The returned `refresh_token` is `None` when the provider did not rotate
/// it; the caller keeps the one it has.
pub async fn refresh_token(
    http_client: &reqwest::Client,
    endpoints: &Endpoints,
    credentials: &Credentials,
    refresh_token_value: &str,
) -> Result<TokenResponse> {
    debug!("Refreshing Upwork access token");

    let form_data = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token_value),
        ("redirect_uri", credentials.redirect_uri.as_str()),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
    ];

    let mut token =
        post_token_form(http_client, &endpoints.token_url, &form_data, "refresh").await?;
    token.refresh_token = token.refresh_token.filter(|r| !r.is_empty());

    debug!(rotated = token.refresh_token.is_some(), "Upwork token refresh successful");
    Ok(token)
}

async fn post_token_form(
    http_client: &reqwest::Client,
    token_url: &str,
    form_data: &[(&str, &str)],
    operation: &'static str,
) -> Result<TokenResponse> {
    let response = http_client.post(token_url).form(form_data).send().await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(error) => warn!(
                operation,
                status = status.as_u16(),
                error = %error.error,
                description = ?error.error_description,
                "Upwork token request failed"
            ),
            Err(_) => warn!(
                operation,
                status = status.as_u16(),
                "Upwork token request failed"
            ),
        }
        return Err(Error::AuthProvider {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| Error::InvalidResponse(format!("Failed to parse token response: {}", e)))?;

    if token.access_token.is_empty() {
        return Err(Error::InvalidResponse(
            "Empty access token in token response".to_string(),
        ));
    }

    Ok(token)
}
