//! Core traits and types for secret lookup

use thiserror::Error;

/// Errors that can occur during secret store lookups
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store not available: {0}")]
    NotAvailable(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// A read-only source of secret values
///
/// Implementations:
/// - Remote context snapshot (`EscSecretStore`)
/// - System keychain (`KeychainSecretStore`)
/// - In-memory for testing (`MemorySecretStore`)
///
/// Several stores are consulted in order through `ChainSecretStore`.
///
/// # Example
///
/// ```
/// use sophia_config_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::from_pairs([("openai_api_key", "sk-test")]);
/// assert_eq!(store.get("openai_api_key"), Some("sk-test".to_string()));
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Check if this store is available
    ///
    /// An unavailable store is skipped by the chain without complaint.
    fn is_available(&self) -> bool {
        true
    }

    /// Retrieve a secret, separating "absent" from "backend failed"
    ///
    /// `Ok(None)` means the store answered and has no such key.
    fn try_get(&self, key: &str) -> SecretStoreResult<Option<String>>;

    /// Retrieve a secret, treating a failed backend as absent
    fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).ok().flatten()
    }
}
