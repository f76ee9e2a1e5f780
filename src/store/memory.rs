//! In-memory config store.

use super::ConfigStore;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::instrument;

/// In-memory config store.
///
/// Uses `Arc<RwLock<HashMap>>` for thread-safe access. Useful for testing
/// and ephemeral sessions. Clones share the same map, so a test can keep a
/// handle and inspect what the token manager persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryConfigStore {
    /// Create a new empty MemoryConfigStore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a MemoryConfigStore pre-populated with entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().map(|g| g.clone()).unwrap_or_default()
    }

    /// Get the number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::Storage("memory store lock poisoned".to_string())
}

impl ConfigStore for MemoryConfigStore {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.inner.read().map_err(|_| poisoned())?;
        Ok(guard.get(key).cloned())
    }

    #[instrument(skip_all, fields(count = entries.len()))]
    fn update(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        for (key, value) in entries {
            guard.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        for key in keys {
            guard.remove(*key);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
