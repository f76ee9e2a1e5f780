#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use upwork_oauth::{Credentials, Endpoints, MemoryConfigStore, TokenManager, TokenState};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "client-123";
pub const CLIENT_SECRET: &str = "secret-456";
pub const REDIRECT_URI: &str = "https://example.com/callback";

pub fn credentials(auth_code: Option<&str>) -> Credentials {
    Credentials {
        client_id: CLIENT_ID.into(),
        client_secret: CLIENT_SECRET.into(),
        redirect_uri: REDIRECT_URI.into(),
        auth_code: auth_code.map(String::from),
    }
}

pub fn expired_tokens(access: &str, refresh: &str) -> TokenState {
    TokenState {
        access_token: Some(access.into()),
        refresh_token: Some(refresh.into()),
        expires_at: TokenState::now() - 10,
    }
}

pub fn valid_tokens(access: &str, refresh: &str) -> TokenState {
    TokenState {
        access_token: Some(access.into()),
        refresh_token: Some(refresh.into()),
        expires_at: TokenState::now() + 3600,
    }
}

/// Manager pointed at the mock server, backed by an in-memory store.
pub fn manager(
    server: &MockServer,
    auth_code: Option<&str>,
    tokens: TokenState,
) -> (Arc<TokenManager>, MemoryConfigStore) {
    let store = MemoryConfigStore::new();
    let manager = TokenManager::with_state(credentials(auth_code), tokens, Arc::new(store.clone()))
        .with_endpoints(Endpoints::with_base_url(&server.uri()));
    (Arc::new(manager), store)
}

/// Mount a token endpoint that answers a refresh grant exactly `times` times.
pub async fn mount_refresh(server: &MockServer, body: serde_json::Value, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: i64) -> serde_json::Value {
    match refresh {
        Some(refresh) => json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": expires_in,
            "token_type": "Bearer"
        }),
        None => json!({
            "access_token": access,
            "expires_in": expires_in,
            "token_type": "Bearer"
        }),
    }
}
