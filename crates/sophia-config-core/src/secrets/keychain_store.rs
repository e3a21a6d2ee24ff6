//! System keychain secret store
//!
//! Uses the OS keychain as a secondary secret source:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Values are provisioned with the platform's own tools; this store only reads.

use keyring::Entry;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Secret store backed by the system keychain
///
/// Entries are namespaced by service name, so with service `sophia` the key
/// `openai_api_key` is read from `sophia:openai_api_key`.
///
/// # Example
///
/// ```no_run
/// use sophia_config_core::secrets::{KeychainSecretStore, SecretStore};
///
/// let store = KeychainSecretStore::with_service("sophia");
/// if store.is_available() {
///     let _key = store.get("openai_api_key");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct KeychainSecretStore {
    service_name: String,
}

impl KeychainSecretStore {
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> SecretStoreResult<Entry> {
        Entry::new(&self.service_name, key)
            .map_err(|e| SecretStoreError::Other(format!("Failed to create keychain entry: {}", e)))
    }
}

impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &str {
        "keychain"
    }

    /// Fails on headless hosts without a keychain daemon
    fn is_available(&self) -> bool {
        Entry::new(&self.service_name, "__sophia_availability_check__").is_ok()
    }

    fn try_get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(password) if password.trim().is_empty() => Ok(None),
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SecretStoreError::NotAvailable(format!("keychain read failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires system keychain
    fn test_missing_entry_is_none() {
        let store = KeychainSecretStore::with_service("sophia-test");
        assert_eq!(store.try_get("sophia_never_provisioned_key").unwrap(), None);
    }

    #[test]
    fn test_name_and_service() {
        let store = KeychainSecretStore::with_service("sophia");
        assert_eq!(store.name(), "keychain");
        assert_eq!(store.service_name(), "sophia");
    }
}
