//! Secure credential storage.
//!
//! `SecureStore` is the host's key-value secret store (keychain, keystore).
//! The crate ships an in-memory store and a file-backed one; the
//! [`CredentialVault`] is the only writer of session credentials.

mod file;
mod memory;
mod vault;

pub use file::FileSecureStore;
pub use memory::MemorySecureStore;
pub use vault::{Credential, CredentialVault, Identity};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::StorageError;

/// Async key-value store for secrets. `set` returns once the write is durable.
#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn set(&self, key: &str, value: &SecretString) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<SecretString>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Keys are restricted to `[A-Za-z0-9._-]` and may not start with a dot.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
