//! Credential storage abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`StoredToken`] - The access/refresh token pair with its expiry
//! - [`CredentialStore`] - Trait for credential storage backends
//! - [`FileStore`] - JSON file backend
//! - [`VaultStore`] - HashiCorp Vault backend
//! - [`MemoryStore`] - In-memory implementation for testing
//!
//! A store owns one OAuth client identity and one token triple. The triple is
//! always read and written as a whole.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod file;
mod memory;
mod vault;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use vault::{VaultSettings, VaultStore};

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the buffer is zeroed when the secret is dropped.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret holds an empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// OAuth client identity registered in the vendor developer console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret,
}

/// The access/refresh token pair and the access token's expiry.
///
/// Serialized with the field names of the on-disk credential file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredToken {
    pub access_token: Secret,
    pub refresh_token: Secret,
    pub expiry: DateTime<Utc>,
}

impl StoredToken {
    /// Create a new token triple.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: Secret::new(access_token),
            refresh_token: Secret::new(refresh_token),
            expiry,
        }
    }

    /// Check if the access token expires within the given window.
    ///
    /// An already expired token is always within the window.
    pub fn expires_within(&self, window: chrono::Duration) -> bool {
        self.expiry - window < Utc::now()
    }
}

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No token has been stored yet.
    #[error("no token stored at {location}")]
    NotFound { location: String },

    /// The store cannot produce a usable client identity.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The backend refused or could not establish authentication.
    #[error("authorization failed: {message}")]
    Authorization { message: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the store failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstraction over credential storage backends.
///
/// Implementations must make [`update_token`](CredentialStore::update_token)
/// atomic with respect to concurrent readers and writers: several vehicle
/// pollers share one store. No lock spans the read-refresh-write sequence, so
/// two pollers refreshing at the same time both write and the last one wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Return the OAuth client identity.
    ///
    /// Fails with [`StoreError::Configuration`] unless both values are non-empty.
    async fn client_credentials(&self) -> Result<ClientCredentials, StoreError>;

    /// Return the stored token triple.
    ///
    /// Fails with [`StoreError::NotFound`] if no token was ever stored.
    async fn token(&self) -> Result<StoredToken, StoreError>;

    /// Check whether a non-empty refresh token is stored.
    ///
    /// Absence is `Ok(false)`, never an error.
    async fn has_credentials(&self) -> Result<bool, StoreError> {
        match self.token().await {
            Ok(token) => Ok(!token.refresh_token.is_empty()),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replace the stored token triple.
    async fn update_token(&self, token: &StoredToken) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<S> {
    async fn client_credentials(&self) -> Result<ClientCredentials, StoreError> {
        (**self).client_credentials().await
    }

    async fn token(&self) -> Result<StoredToken, StoreError> {
        (**self).token().await
    }

    async fn has_credentials(&self) -> Result<bool, StoreError> {
        (**self).has_credentials().await
    }

    async fn update_token(&self, token: &StoredToken) -> Result<(), StoreError> {
        (**self).update_token(token).await
    }
}

/// Validate a client identity, mapping empty values to a configuration error.
pub(crate) fn require_client_credentials(
    client_id: &str,
    client_secret: &Secret,
) -> Result<ClientCredentials, StoreError> {
    if client_id.is_empty() || client_secret.is_empty() {
        return Err(StoreError::Configuration {
            message: "client id and client secret must both be set".to_string(),
        });
    }

    Ok(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: client_secret.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_stored_token_debug_hides_tokens() {
        let token = StoredToken::new("access", "refresh", Utc::now());
        let debug = format!("{:?}", token);
        assert!(!debug.contains("access\""));
        assert!(!debug.contains("refresh\""));
    }

    #[test]
    fn test_expires_within() {
        let token = StoredToken::new("a", "r", Utc::now() + Duration::minutes(10));
        assert!(!token.expires_within(Duration::minutes(5)));
        assert!(token.expires_within(Duration::minutes(15)));

        let expired = StoredToken::new("a", "r", Utc::now() - Duration::minutes(1));
        assert!(expired.expires_within(Duration::minutes(5)));
    }

    #[test]
    fn test_require_client_credentials() {
        assert!(require_client_credentials("id", &Secret::new("secret")).is_ok());
        assert!(matches!(
            require_client_credentials("", &Secret::new("secret")),
            Err(StoreError::Configuration { .. })
        ));
        assert!(matches!(
            require_client_credentials("id", &Secret::default()),
            Err(StoreError::Configuration { .. })
        ));
    }
}
