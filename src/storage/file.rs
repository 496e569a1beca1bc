use std::path::{Path, PathBuf};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::fs;
use tracing::debug;

use crate::error::StorageError;

use super::{SecureStore, validate_key};

/// One file per key under a private directory.
///
/// Writes go to a temp file that is synced and renamed into place, so a
/// completed `set` survives a crash. On unix the file is created `0600`.
pub struct FileSecureStore {
    root: PathBuf,
}

impl FileSecureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn set(&self, key: &str, value: &SecretString) -> Result<(), StorageError> {
        validate_key(key)?;
        fs::create_dir_all(&self.root).await?;

        let target = self.path_for(key);
        let tmp = self.root.join(format!(".{key}.tmp"));
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await.map_err(write_failed)?;
        tokio::io::AsyncWriteExt::write_all(&mut file, value.expose_secret().as_bytes())
            .await
            .map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        fs::rename(&tmp, &target).await.map_err(write_failed)?;
        debug!(key = key, "Secure store entry written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<SecretString>, StorageError> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(SecretString::from(contents))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
