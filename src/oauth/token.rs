//! Token state and expiry handling.
//!
//! This module provides [`TokenState`], the in-memory copy of the persisted
//! token triple, together with the expiry predicate that gates every
//! authenticated call.
//!
//! # Expiry sentinel
//!
//! `expires_at` is a plain Unix timestamp. The value `0`
//! ([`EXPIRES_AT_UNSET`]) means "unknown / never set" and always compares as
//! expired, so a token loaded without an expiry is refreshed before use.

use serde::Serialize;
use std::time::Duration;

use crate::config::optional;
use crate::error::{Error, Result};
use crate::store::{ConfigStore, keys};

/// `expires_at` value meaning "unknown / never set".
pub const EXPIRES_AT_UNSET: i64 = 0;

/// Default safety margin for expiry checks (60 seconds).
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Where a token stands relative to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLifecycle {
    /// No access token.
    Unauthenticated,
    /// Access token present and outside the expiry buffer.
    Valid,
    /// Access token present but expired or inside the buffer.
    Expiring,
}

impl TokenLifecycle {
    /// Whether a network round-trip is needed before the token can be used.
    pub fn needs_network(self) -> bool {
        !matches!(self, Self::Valid)
    }
}

/// In-memory token state, owned by the token manager.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    /// Bearer credential; `None` means unauthenticated.
    pub access_token: Option<String>,
    /// `None` means refresh is impossible and the user must log in again.
    pub refresh_token: Option<String>,
    /// Unix timestamp of access token expiry; [`EXPIRES_AT_UNSET`] if unknown.
    pub expires_at: i64,
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenState {
    /// Load persisted token state from the store.
    ///
    /// Missing or empty keys become `None`; a missing `expires_at` becomes
    /// [`EXPIRES_AT_UNSET`]. `expires_at` may be written as an integer or a
    /// float (`"1700000000.25"`); fractional seconds are dropped.
    pub fn load(store: &dyn ConfigStore) -> Result<Self> {
        let expires_at = match optional(store, keys::EXPIRES_AT)? {
            Some(raw) => parse_expires_at(&raw)?,
            None => EXPIRES_AT_UNSET,
        };

        Ok(Self {
            access_token: optional(store, keys::ACCESS_TOKEN)?,
            refresh_token: optional(store, keys::REFRESH_TOKEN)?,
            expires_at,
        })
    }

    /// Current Unix time in seconds.
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Expiry predicate against an explicit clock: `now > expires_at - buffer`.
    ///
    /// Exactly at `expires_at - buffer` the token still counts as valid.
    #[must_use]
    pub fn is_expired_at(&self, now: i64, buffer_secs: i64) -> bool {
        now > self.expires_at.saturating_sub(buffer_secs)
    }

    /// Check whether the access token is expired or inside the buffer.
    #[must_use]
    pub fn is_expired(&self, buffer_secs: i64) -> bool {
        self.is_expired_at(Self::now(), buffer_secs)
    }

    /// Classify the state against an explicit clock.
    pub fn lifecycle_at(&self, now: i64, buffer_secs: i64) -> TokenLifecycle {
        match self.access_token {
            None => TokenLifecycle::Unauthenticated,
            Some(_) if self.is_expired_at(now, buffer_secs) => TokenLifecycle::Expiring,
            Some(_) => TokenLifecycle::Valid,
        }
    }

    /// Classify the state against the system clock.
    pub fn lifecycle(&self, buffer_secs: i64) -> TokenLifecycle {
        self.lifecycle_at(Self::now(), buffer_secs)
    }

    /// Get the duration until the access token expires.
    ///
    /// Returns `Duration::ZERO` if it already has, or if no expiry is known.
    pub fn time_until_expiry(&self) -> Duration {
        let remaining = self.expires_at.saturating_sub(Self::now());
        if self.expires_at == EXPIRES_AT_UNSET || remaining <= 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(remaining as u64)
        }
    }

    /// Install a freshly issued token pair.
    ///
    /// The access token and expiry are always replaced. The refresh token is
    /// replaced only when the provider sent one; otherwise the current one is
    /// kept.
    pub(crate) fn apply(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: i64,
    ) {
        self.access_token = Some(access_token);
        if let Some(refresh) = refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.expires_at = expires_at;
    }

    /// Store entries for the three persisted keys.
    ///
    /// An absent token is written as an empty string, which reads back as
    /// `None`.
    pub(crate) fn to_entries(&self) -> [(&'static str, String); 3] {
        [
            (keys::ACCESS_TOKEN, self.access_token.clone().unwrap_or_default()),
            (keys::REFRESH_TOKEN, self.refresh_token.clone().unwrap_or_default()),
            (keys::EXPIRES_AT, self.expires_at.to_string()),
        ]
    }
}

fn parse_expires_at(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Ok(secs);
    }
    match raw.parse::<f64>() {
        Ok(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        _ => Err(Error::Storage(format!(
            "Invalid '{}' value '{}': expected seconds since the Unix epoch",
            keys::EXPIRES_AT,
            raw
        ))),
    }
}
