//! OAuth token lifecycle for the Upwork API.
//!
//! # Architecture
//!
//! - [`TokenManager`] - Owns credentials and token state, gates every call
//! - [`TokenState`] - Token triple with the expiry predicate
//! - [`TokenProvider`] - What API clients depend on to get a bearer token
//! - [`upwork`] - Provider wire calls (authorization URL, exchange, refresh)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use upwork_oauth::{FileConfigStore, TokenManager};
//!
//! # async fn run() -> upwork_oauth::Result<()> {
//! let store = Arc::new(FileConfigStore::new("upwork.toml"));
//! let manager = TokenManager::from_store(store)?;
//!
//! println!("Authorize at {}", manager.build_authorization_url());
//! // ... operator pastes the code into upwork.toml as `auth_code` ...
//! manager.exchange_code_for_tokens().await?;
//! manager.ensure_token_valid().await?;
//! # Ok(())
//! # }
//! ```

pub mod token;
pub mod upwork;

pub use token::{
    DEFAULT_EXPIRES_IN_SECS, DEFAULT_EXPIRY_BUFFER_SECS, EXPIRES_AT_UNSET, TokenLifecycle,
    TokenState,
};

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{Credentials, Endpoints};
use crate::error::{Error, Result};
use crate::net;
use crate::store::{ConfigStore, keys};

// =============================================================================
// TokenProvider Trait
// =============================================================================

/// Trait for providing access tokens.
///
/// Abstracts the source of tokens from the API client. Implementations
/// must make sure the returned token is valid, refreshing first if needed.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a valid bearer token.
    async fn bearer_token(&self) -> Result<String>;
}

// =============================================================================
// TokenStatus
// =============================================================================

/// Snapshot of the token manager, suitable for display.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    /// Whether an access token exists.
    pub authenticated: bool,
    /// Whether the access token is expired or inside the buffer.
    pub expired: bool,
    /// Whether a refresh is possible without logging in again.
    pub has_refresh_token: bool,
    /// Whether an unused authorization code is waiting to be exchanged.
    pub has_auth_code: bool,
    /// Unix timestamp of expiry (`0` if unknown).
    pub expires_at: i64,
    /// Seconds until the token expires (None if not authenticated).
    pub expires_in_secs: Option<u64>,
    /// Lifecycle classification.
    pub lifecycle: TokenLifecycle,
}

// =============================================================================
// TokenManager
// =============================================================================

/// Mutable state behind the manager's lock.
struct Session {
    /// Consumed by the first successful exchange.
    auth_code: Option<String>,
    tokens: TokenState,
}

/// Manages the Upwork token lifecycle.
///
/// Thread-safe: every operation that reads or replaces the token runs under
/// a single async mutex, and that mutex is held across the refresh
/// round-trip. Concurrent [`ensure_token_valid`](Self::ensure_token_valid)
/// calls therefore refresh at most once; later callers see the new token.
pub struct TokenManager {
    /// `auth_code` is always `None` here; the pending code lives in the session.
    credentials: Credentials,
    endpoints: Endpoints,
    store: Arc<dyn ConfigStore>,
    http_client: reqwest::Client,
    expiry_buffer_secs: i64,
    session: Mutex<Session>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .field("store", &self.store.name())
            .field("expiry_buffer_secs", &self.expiry_buffer_secs)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager with the given credentials and no token yet.
    pub fn new(credentials: Credentials, store: Arc<dyn ConfigStore>) -> Self {
        Self::with_state(credentials, TokenState::default(), store)
    }

    /// Create a manager with pre-existing token state.
    pub fn with_state(
        mut credentials: Credentials,
        tokens: TokenState,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let auth_code = credentials.auth_code.take();

        Self {
            credentials,
            endpoints: Endpoints::default(),
            store,
            http_client: net::build_client(),
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
            session: Mutex::new(Session { auth_code, tokens }),
        }
    }

    /// Load credentials and persisted tokens from the store.
    pub fn from_store(store: Arc<dyn ConfigStore>) -> Result<Self> {
        let credentials = Credentials::load(store.as_ref())?;
        let tokens = TokenState::load(store.as_ref())?;
        debug!(
            store = store.name(),
            authenticated = tokens.access_token.is_some(),
            pending_code = credentials.auth_code.is_some(),
            "Loaded Upwork credentials"
        );
        Ok(Self::with_state(credentials, tokens, store))
    }

    /// Override the provider endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the HTTP client (useful for testing or custom TLS config).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Set the safety margin used by [`ensure_token_valid`](Self::ensure_token_valid).
    pub fn with_expiry_buffer(mut self, buffer_secs: i64) -> Self {
        self.expiry_buffer_secs = buffer_secs;
        self
    }

    /// Provider endpoints in use.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Safety margin in seconds applied before expiry.
    pub fn expiry_buffer_secs(&self) -> i64 {
        self.expiry_buffer_secs
    }

    /// HTTP client shared with API calls.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    // =========================================================================
    // Authorization URL
    // =========================================================================

    /// URL the operator visits to obtain an authorization code.
    pub fn build_authorization_url(&self) -> String {
        upwork::build_authorize_url(
            &self.endpoints,
            &self.credentials.client_id,
            &self.credentials.redirect_uri,
        )
    }

    // =========================================================================
    // Token acquisition
    // =========================================================================

    /// Exchange the stored authorization code for the initial token pair.
    ///
    /// Fails with [`Error::Configuration`] (carrying the authorization URL)
    /// before any network call when no code is stored. Provider failures
    /// leave both memory and the store untouched.
    pub async fn exchange_code_for_tokens(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        let Some(code) = session.auth_code.clone() else {
            return Err(Error::Configuration(format!(
                "No auth_code found in config. Visit this URL to get it:\n{}",
                self.build_authorization_url()
            )));
        };

        let response = upwork::exchange_code(
            &self.http_client,
            &self.endpoints,
            &self.credentials,
            &code,
        )
        .await?;

        let expires_in = response.expires_in_or_default();
        // The code is spent; blank it in the same write as the tokens so a
        // restart does not replay it.
        session.auth_code = None;
        self.persist_locked(
            &mut session.tokens,
            response.access_token,
            response.refresh_token,
            expires_in,
            &[(keys::AUTH_CODE, String::new())],
        )?;

        info!(expires_in, "Login successful, access token obtained");
        Ok(())
    }

    /// Obtain a new access token with the stored refresh token.
    ///
    /// Fails with [`Error::Configuration`] before any network call when no
    /// refresh token is stored.
    pub async fn refresh_access_token(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.refresh_locked(&mut session.tokens).await
    }

    async fn refresh_locked(&self, tokens: &mut TokenState) -> Result<()> {
        let Some(refresh) = tokens.refresh_token.clone() else {
            return Err(Error::Configuration(
                "No refresh token available; you must login again".to_string(),
            ));
        };

        let response = upwork::refresh_token(
            &self.http_client,
            &self.endpoints,
            &self.credentials,
            &refresh,
        )
        .await?;

        let expires_in = response.expires_in_or_default();
        let rotated = response.refresh_token.is_some();
        self.persist_locked(
            tokens,
            response.access_token,
            response.refresh_token,
            expires_in,
            &[],
        )?;

        info!(expires_in, rotated, "Access token refreshed");
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Install a token pair and write it to the store.
    ///
    /// `expires_at` becomes `now + expires_in`. A `None` refresh token keeps
    /// the current one. All three keys go to the store in a single update.
    pub async fn persist_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
    ) -> Result<()> {
        let mut session = self.session.lock().await;
        self.persist_locked(&mut session.tokens, access_token, refresh_token, expires_in, &[])
    }

    /// `extra` entries go to the store in the same update as the tokens.
    fn persist_locked(
        &self,
        tokens: &mut TokenState,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        extra: &[(&'static str, String)],
    ) -> Result<()> {
        let expires_at = TokenState::now().saturating_add(expires_in);
        tokens.apply(access_token, refresh_token, expires_at);

        let mut entries = tokens.to_entries().to_vec();
        entries.extend_from_slice(extra);
        self.store.update(&entries)?;
        debug!(expires_at, store = self.store.name(), "Tokens persisted");
        Ok(())
    }

    // =========================================================================
    // Validity
    // =========================================================================

    /// `now > expires_at - buffer_secs`.
    ///
    /// [`DEFAULT_EXPIRY_BUFFER_SECS`] is the usual buffer; see
    /// [`is_token_expired_default`](Self::is_token_expired_default).
    pub async fn is_token_expired(&self, buffer_secs: i64) -> bool {
        self.session.lock().await.tokens.is_expired(buffer_secs)
    }

    /// [`is_token_expired`](Self::is_token_expired) with the manager's
    /// buffer, which is [`DEFAULT_EXPIRY_BUFFER_SECS`] unless overridden by
    /// [`with_expiry_buffer`](Self::with_expiry_buffer).
    pub async fn is_token_expired_default(&self) -> bool {
        self.is_token_expired(self.expiry_buffer_secs).await
    }

    /// Refresh if the access token is missing or expired; otherwise no-op.
    ///
    /// Call before every authenticated request.
    pub async fn ensure_token_valid(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.ensure_locked(&mut session.tokens).await
    }

    async fn ensure_locked(&self, tokens: &mut TokenState) -> Result<()> {
        let lifecycle = tokens.lifecycle(self.expiry_buffer_secs);
        if lifecycle.needs_network() {
            debug!(?lifecycle, "Token needs refresh, refreshing...");
            self.refresh_locked(tokens).await?;
        }
        Ok(())
    }

    /// Ensure validity, then return the access token.
    ///
    /// Both steps happen under one lock, so the token returned is the one
    /// that was just validated.
    pub async fn access_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        self.ensure_locked(&mut session.tokens).await?;
        session
            .tokens
            .access_token
            .clone()
            .ok_or_else(|| Error::Configuration("No access token after refresh".to_string()))
    }

    // =========================================================================
    // Inspection and logout
    // =========================================================================

    /// Copy of the current token state.
    pub async fn token_state(&self) -> TokenState {
        self.session.lock().await.tokens.clone()
    }

    /// Current status report.
    pub async fn status(&self) -> TokenStatus {
        let session = self.session.lock().await;
        let tokens = &session.tokens;
        let authenticated = tokens.access_token.is_some();

        TokenStatus {
            authenticated,
            expired: tokens.is_expired(self.expiry_buffer_secs),
            has_refresh_token: tokens.refresh_token.is_some(),
            has_auth_code: session.auth_code.is_some(),
            expires_at: tokens.expires_at,
            expires_in_secs: authenticated.then(|| tokens.time_until_expiry().as_secs()),
            lifecycle: tokens.lifecycle(self.expiry_buffer_secs),
        }
    }

    /// Forget the tokens, in memory and in the store.
    ///
    /// Credentials stay; the next session starts from a new authorization code.
    pub async fn logout(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.store.remove(&keys::TOKEN_KEYS)?;
        session.tokens = TokenState::default();
        info!("Tokens removed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenProvider for TokenManager {
    async fn bearer_token(&self) -> Result<String> {
        self.access_token().await
    }
}

#[async_trait::async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn bearer_token(&self) -> Result<String> {
        (**self).bearer_token().await
    }
}
