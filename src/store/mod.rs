//! Config store implementations.
//!
//! The store holds the `[upwork]` section: client credentials, the pending
//! authorization code and the persisted token triple.

pub mod file;
pub mod memory;
pub mod trait_def;

// Re-exports
pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;
pub use trait_def::ConfigStore;

/// Section holding every key this crate reads or writes.
pub const SECTION: &str = "upwork";

/// Key names inside [`SECTION`].
pub mod keys {
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const REDIRECT_URI: &str = "redirect_uri";
    pub const AUTH_CODE: &str = "auth_code";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const EXPIRES_AT: &str = "expires_at";

    /// The keys written together by a token persist.
    pub const TOKEN_KEYS: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, EXPIRES_AT];
}
