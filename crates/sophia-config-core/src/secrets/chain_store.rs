//! Ordered chain of secret stores

use std::sync::Arc;

use super::traits::{SecretStore, SecretStoreError};

/// A value found in the chain, with the store that held it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretHit {
    pub store: String,
    pub value: String,
}

/// Secret stores consulted in order, first non-blank value wins
///
/// Unavailable stores are skipped. A store that fails a lookup does not stop
/// the search; the failure is handed to the caller and the next store is
/// asked.
///
/// # Example
///
/// ```
/// use sophia_config_core::secrets::{ChainSecretStore, MemorySecretStore, SecretStore};
/// use std::sync::Arc;
///
/// let primary: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
/// let fallback: Arc<dyn SecretStore> =
///     Arc::new(MemorySecretStore::from_pairs([("k", "from-fallback")]));
///
/// let chain = ChainSecretStore::new(vec![primary, fallback]);
/// let hit = chain.lookup("k", |_, _| {}).unwrap();
/// assert_eq!((hit.store.as_str(), hit.value.as_str()), ("memory", "from-fallback"));
/// ```
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &[Arc<dyn SecretStore>] {
        &self.stores
    }

    /// Whether any store in the chain can answer
    pub fn is_available(&self) -> bool {
        self.stores.iter().any(|s| s.is_available())
    }

    /// First non-blank value for `key`
    ///
    /// `on_error` receives the name of each store whose lookup failed.
    pub fn lookup(&self, key: &str, mut on_error: impl FnMut(&str, SecretStoreError)) -> Option<SecretHit> {
        for store in self.stores.iter().filter(|s| s.is_available()) {
            match store.try_get(key) {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    return Some(SecretHit {
                        store: store.name().to_string(),
                        value,
                    })
                }
                Ok(_) => {}
                Err(e) => on_error(store.name(), e),
            }
        }
        None
    }
}

impl std::fmt::Debug for ChainSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stores.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainSecretStore").field("stores", &names).finish()
    }
}
