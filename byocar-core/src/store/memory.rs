//! In-memory credential storage implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    require_client_credentials, ClientCredentials, CredentialStore, Secret, StoreError,
    StoredToken,
};

/// In-memory credential store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
/// It counts token writes so callers can observe redundant updates.
pub struct MemoryStore {
    client_id: String,
    client_secret: Secret,
    token: RwLock<Option<StoredToken>>,
    updates: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store for the given client identity.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret),
            token: RwLock::new(None),
            updates: AtomicUsize::new(0),
        }
    }

    /// Create a store that already holds a token.
    ///
    /// The initial token does not count as an update.
    pub fn with_token(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token: StoredToken,
    ) -> Self {
        let store = Self::new(client_id, client_secret);
        *store.token.write() = Some(token);
        store
    }

    /// Number of [`update_token`](CredentialStore::update_token) calls so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("client_id", &self.client_id)
            .field("has_token", &self.token.read().is_some())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn client_credentials(&self) -> Result<ClientCredentials, StoreError> {
        require_client_credentials(&self.client_id, &self.client_secret)
    }

    async fn token(&self) -> Result<StoredToken, StoreError> {
        self.token.read().clone().ok_or_else(|| StoreError::NotFound {
            location: "memory".to_string(),
        })
    }

    async fn update_token(&self, token: &StoredToken) -> Result<(), StoreError> {
        *self.token.write() = Some(token.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
