use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::StorageError;

use super::{SecureStore, validate_key};

/// In-process secure store, for headless hosts and tests.
#[derive(Default)]
pub struct MemorySecureStore {
    entries: RwLock<HashMap<String, SecretString>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set(&self, key: &str, value: &SecretString) -> Result<(), StorageError> {
        validate_key(key)?;
        let copy = SecretString::from(value.expose_secret().to_owned());
        self.entries.write().await.insert(key.to_string(), copy);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<SecretString>, StorageError> {
        validate_key(key)?;
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|v| SecretString::from(v.expose_secret().to_owned())))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
