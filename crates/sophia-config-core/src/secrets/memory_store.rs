//! In-memory secret store

use std::collections::HashMap;

use super::traits::{SecretStore, SecretStoreResult};

/// Fixed in-memory secret store, for tests and injected configurations
///
/// # Example
///
/// ```
/// use sophia_config_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::from_pairs([("openai_api_key", "sk-test")]);
/// assert!(store.get("openai_api_key").is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
    unavailable: bool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            secrets: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            unavailable: false,
        }
    }

    /// Same values, but the store reports itself unavailable
    pub fn offline(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn try_get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        Ok(self.secrets.get(key).cloned())
    }
}
