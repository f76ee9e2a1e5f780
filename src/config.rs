use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::store::{ConfigStore, keys};

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Settings whose value came from an environment variable.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Setting key (e.g. "logging.level") -> env var name.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Process settings read from the same TOML file as the `[upwork]` section.
///
/// Credentials and tokens are not part of this struct; they go through the
/// [`ConfigStore`] so the token manager can write them back.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Provider endpoints.
///
/// Fixed to Upwork's production URLs by default; the fields exist so a
/// staging host or a local mock server can stand in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoints {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Endpoints {
    /// Point the token and API endpoints at `base` (a mock server in tests).
    ///
    /// The token endpoint becomes `{base}/oauth2/token`, matching the
    /// production layout under `/api/v3`.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/oauth2/authorize"),
            token_url: format!("{base}/oauth2/token"),
            api_base_url: base.to_string(),
        }
    }

    /// Job search endpoint.
    pub fn search_jobs_url(&self) -> String {
        format!("{}/search/jobs", self.api_base_url.trim_end_matches('/'))
    }

    /// Authenticated client's own profile.
    pub fn profile_url(&self) -> String {
        format!(
            "{}/profile/clients/me",
            self.api_base_url.trim_end_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}
fn default_auth_url() -> String {
    "https://www.upwork.com/ab/account-security/oauth2/authorize".to_string()
}
fn default_token_url() -> String {
    "https://www.upwork.com/api/v3/oauth2/token".to_string()
}
fn default_api_base_url() -> String {
    "https://www.upwork.com/api/v3".to_string()
}

// ---------------------------------------------------------------------------
// Settings loading and env overrides
// ---------------------------------------------------------------------------

impl Settings {
    /// Load settings from a TOML file, then apply environment variable
    /// overrides. Any setting with an `UPWORK_` variable set takes precedence
    /// over the file value and is tracked in `env_overrides`.
    ///
    /// A missing file yields defaults; the `[upwork]` table is ignored here.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_string {
            ($env:literal, $key:literal, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }

        env_string!("UPWORK_LOG_LEVEL", "logging.level", self.logging.level);
        env_string!("UPWORK_AUTH_URL", "endpoints.auth_url", self.endpoints.auth_url);
        env_string!("UPWORK_TOKEN_URL", "endpoints.token_url", self.endpoints.token_url);
        env_string!(
            "UPWORK_API_BASE_URL",
            "endpoints.api_base_url",
            self.endpoints.api_base_url
        );

        if let Ok(val) = std::env::var("UPWORK_LOG_JSON") {
            if let Some(b) = parse_env_bool(&val) {
                self.logging.json = b;
                ov.record("logging.json", "UPWORK_LOG_JSON");
            } else {
                tracing::warn!(value = %val, "Ignoring UPWORK_LOG_JSON: not a boolean");
            }
        }

        self.env_overrides = ov;
    }
}

fn parse_env_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// OAuth client credentials, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// One-time authorization code; present only before the first exchange.
    pub auth_code: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_code", &self.auth_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the store.
    ///
    /// `client_id`, `client_secret` and `redirect_uri` are required;
    /// `auth_code` is optional. Empty values count as missing.
    pub fn load(store: &dyn ConfigStore) -> Result<Self> {
        Ok(Self {
            client_id: required(store, keys::CLIENT_ID)?,
            client_secret: required(store, keys::CLIENT_SECRET)?,
            redirect_uri: required(store, keys::REDIRECT_URI)?,
            auth_code: optional(store, keys::AUTH_CODE)?,
        })
    }
}

/// Read a key, treating an empty or whitespace-only value as absent.
pub(crate) fn optional(store: &dyn ConfigStore, key: &str) -> Result<Option<String>> {
    Ok(store.get(key)?.filter(|v| !v.trim().is_empty()))
}

fn required(store: &dyn ConfigStore, key: &str) -> Result<String> {
    optional(store, key)?.ok_or_else(|| {
        Error::Configuration(format!(
            "Missing '{}' in [{}] section of the config",
            key,
            crate::store::SECTION
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
