//! Secret lookup abstractions and implementations
//!
//! This module provides a pluggable, read-only secret tier with:
//! - `SecretStore` trait for implementing custom stores
//! - Built-in implementations: `EscSecretStore`, `KeychainSecretStore`,
//!   `MemorySecretStore`
//! - `ChainSecretStore` to consult several stores in order
//! - `EnvSecretStore` for the environment variable tier

mod traits;
mod env_store;
mod memory_store;
mod chain_store;
mod keychain_store;
mod esc_store;

pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use chain_store::{ChainSecretStore, SecretHit};
pub use keychain_store::KeychainSecretStore;
pub use esc_store::EscSecretStore;
