//! JSON file credential storage.
//!
//! The token triple lives in a single JSON document:
//!
//! ```json
//! {
//!   "AccessToken": "...",
//!   "RefreshToken": "...",
//!   "Expiry": "2024-05-01T12:00:00.123456789Z"
//! }
//! ```
//!
//! The client identity is supplied by configuration and never written to disk.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{
    require_client_credentials, ClientCredentials, CredentialStore, Secret, StoreError,
    StoredToken,
};

/// File-backed credential store.
///
/// A missing file is the valid "not authorized yet" state. Writes go to a
/// temporary file in the same directory which is then renamed over the
/// target, so readers never observe a partially written document.
pub struct FileStore {
    path: PathBuf,
    client_id: String,
    client_secret: Secret,
}

impl FileStore {
    /// Open a store at `path`.
    ///
    /// The file does not need to exist; any other error probing it is returned.
    pub fn new(
        path: impl Into<PathBuf>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let path = path.into();

        match std::fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e)),
        }

        Ok(Self {
            path,
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret),
        })
    }

    /// Get the storage path for this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials".to_string());

        self.path
            .with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn client_credentials(&self) -> Result<ClientCredentials, StoreError> {
        require_client_credentials(&self.client_id, &self.client_secret)
    }

    async fn token(&self) -> Result<StoredToken, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    location: self.path.display().to_string(),
                });
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(serde_json::from_slice(&contents)?)
    }

    async fn update_token(&self, token: &StoredToken) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec_pretty(token)?;
        let temp_path = self.temp_path();

        if let Err(e) = tokio::fs::write(&temp_path, &contents).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::Io(e));
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::Io(e));
        }

        tracing::debug!(path = %self.path.display(), "stored token");

        Ok(())
    }
}
