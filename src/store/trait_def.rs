//! Config store trait.

use crate::error::Result;
use std::sync::Arc;

/// Trait for config store backends.
///
/// All implementations must be thread-safe (`Send + Sync`). Every key lives
/// in the single [`SECTION`](super::SECTION); values are strings.
pub trait ConfigStore: Send + Sync {
    /// Read a key, if present.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a subset of keys and durably write them.
    ///
    /// The write is all-or-nothing from the caller's perspective: either
    /// every entry lands or none does.
    fn update(&self, entries: &[(&str, String)]) -> Result<()>;

    /// Remove keys and durably write the result. Missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> Result<()>;

    /// Get the name of this store backend.
    fn name(&self) -> &str;
}

// Blanket implementation for Arc<T>
impl<T: ConfigStore + ?Sized> ConfigStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }
    fn update(&self, entries: &[(&str, String)]) -> Result<()> {
        (**self).update(entries)
    }
    fn remove(&self, keys: &[&str]) -> Result<()> {
        (**self).remove(keys)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

// Blanket implementation for Box<T>
impl<T: ConfigStore + ?Sized> ConfigStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }
    fn update(&self, entries: &[(&str, String)]) -> Result<()> {
        (**self).update(entries)
    }
    fn remove(&self, keys: &[&str]) -> Result<()> {
        (**self).remove(keys)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}
