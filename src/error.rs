//! Error types for upwork-oauth.

use thiserror::Error;

/// The main error type for upwork-oauth.
///
/// Nothing in this crate catches these internally: every failure aborts the
/// requested operation and surfaces to the direct caller.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ────────────────────────────────────────────────────────
    /// A required credential or token is missing. Not retryable; the
    /// operator has to act (visit the authorization URL, log in again, or
    /// fix the config file).
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Provider ─────────────────────────────────────────────────────────────
    /// The token endpoint or a resource endpoint answered with a non-2xx
    /// status. The body is carried verbatim.
    #[error("Auth provider error ({status}): {body}")]
    AuthProvider {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A 2xx response whose body is not what the endpoint promises.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ── Transport ────────────────────────────────────────────────────────────
    /// Network-level failure (connection refused, timeout, DNS).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // ── Storage ──────────────────────────────────────────────────────────────
    /// Config store read/write failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result alias for upwork-oauth.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// HTTP status carried by [`Error::AuthProvider`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthProvider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the operator has to go through the authorization flow again.
    ///
    /// True for missing credentials and for 400/401 answers, which is how
    /// OAuth token endpoints report a revoked or spent grant.
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            Self::Configuration(_) => true,
            Self::AuthProvider { status, .. } => matches!(status, 400 | 401),
            _ => false,
        }
    }
}
