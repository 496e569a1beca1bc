//! Session credential persistence.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::StorageError;

use super::SecureStore;

/// Who a credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub email: String,
}

/// Session token plus identity. The token never appears in `Debug` output.
#[derive(Debug)]
pub struct Credential {
    pub token: SecretString,
    pub identity: Identity,
}

impl Credential {
    pub fn new(token: SecretString, identity: Identity) -> Self {
        Self { token, identity }
    }
}

/// Sole writer of the session token into the shared secure store.
///
/// Writers are serialised: a `persist` holds the vault for the whole write
/// and returns only after the store acknowledged it.
pub struct CredentialVault {
    store: Arc<dyn SecureStore>,
    key: String,
    lock: Mutex<()>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the credential's token. Returns after the store acknowledged it.
    pub async fn persist(&self, credential: &Credential) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        if let Err(e) = self.store.set(&self.key, &credential.token).await {
            warn!(user_id = credential.identity.id, error = %e, "Failed to store session credential");
            return Err(e);
        }
        info!(user_id = credential.identity.id, "Session credential stored");
        Ok(())
    }

    pub async fn token(&self) -> Result<Option<SecretString>, StorageError> {
        let _guard = self.lock.lock().await;
        self.store.get(&self.key).await
    }

    pub async fn has_session(&self) -> Result<bool, StorageError> {
        Ok(self
            .token()
            .await?
            .is_some_and(|t| !t.expose_secret().is_empty()))
    }

    /// Remove the stored token (sign out).
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.store.delete(&self.key).await
    }
}
