//! HashiCorp Vault credential storage.
//!
//! Client identity and token fields are kept as separate entries of one
//! KV (version 1) secret:
//!
//! | entry           | content                         |
//! |-----------------|---------------------------------|
//! | `client-id`     | OAuth client ID                 |
//! | `client-secret` | OAuth client secret             |
//! | `access-token`  | current access token            |
//! | `refresh-token` | current refresh token           |
//! | `expiry`        | RFC 3339 (nanosecond) timestamp |
//!
//! Every operation authenticates from scratch; no Vault session is cached.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use url::Url;

use super::{
    require_client_credentials, ClientCredentials, CredentialStore, Secret, StoreError,
    StoredToken,
};

const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
const TOKEN_FILE_NAME: &str = ".vault-token";

const FIELD_CLIENT_ID: &str = "client-id";
const FIELD_CLIENT_SECRET: &str = "client-secret";
const FIELD_ACCESS_TOKEN: &str = "access-token";
const FIELD_REFRESH_TOKEN: &str = "refresh-token";
const FIELD_EXPIRY: &str = "expiry";

/// Connection and authentication settings for Vault.
///
/// Authentication methods are tried in order: AppRole (`role_id` plus
/// optional `secret_id`), static `token`, then the contents of `token_file`.
#[derive(Clone, Default)]
pub struct VaultSettings {
    pub address: String,
    pub namespace: Option<String>,
    pub role_id: Option<String>,
    pub secret_id: Option<Secret>,
    pub token: Option<Secret>,
    pub token_file: Option<PathBuf>,
}

impl VaultSettings {
    /// Read settings from the standard Vault environment variables.
    ///
    /// Uses `VAULT_ADDR`, `VAULT_NAMESPACE`, `VAULT_ROLE_ID`, `VAULT_SECRET_ID`
    /// and `VAULT_TOKEN`; the token file is `~/.vault-token`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            address: var("VAULT_ADDR").unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string()),
            namespace: var("VAULT_NAMESPACE"),
            role_id: var("VAULT_ROLE_ID"),
            secret_id: var("VAULT_SECRET_ID").map(Secret::new),
            token: var("VAULT_TOKEN").map(Secret::new),
            token_file: directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(TOKEN_FILE_NAME)),
        }
    }
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSettings")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("role_id", &self.role_id)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("token_file", &self.token_file)
            .finish()
    }
}

#[derive(Deserialize)]
struct SecretResponse {
    data: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
    client_token: String,
}

/// Vault-backed credential store.
pub struct VaultStore {
    settings: VaultSettings,
    base: Url,
    key: String,
    http: reqwest::Client,
}

impl VaultStore {
    /// Connect to Vault using settings from the environment.
    ///
    /// Authenticates once to fail early on a broken setup.
    pub async fn new(key: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self::with_settings(VaultSettings::from_env(), key)?;
        store.authorize().await?;
        Ok(store)
    }

    /// Create a store with explicit settings, without contacting Vault.
    pub fn with_settings(
        settings: VaultSettings,
        key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base = Url::parse(&format!("{}/", settings.address.trim_end_matches('/')))
            .map_err(|e| StoreError::Configuration {
                message: format!("invalid Vault address {}: {}", settings.address, e),
            })?;

        Ok(Self {
            settings,
            base,
            key: key.into().trim_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        let url = self
            .base
            .join(&format!("v1/{}", path))
            .map_err(|e| StoreError::Configuration {
                message: format!("invalid Vault path {}: {}", path, e),
            })?;

        let mut builder = self.http.request(method, url);
        if let Some(namespace) = &self.settings.namespace {
            builder = builder.header("X-Vault-Namespace", namespace);
        }
        Ok(builder)
    }

    /// Obtain a Vault token using the first method that works.
    async fn authorize(&self) -> Result<Secret, StoreError> {
        if let Some(role_id) = &self.settings.role_id {
            match self.login_approle(role_id).await {
                Ok(token) => return Ok(token),
                Err(e) => tracing::warn!(error = %e, "AppRole login failed"),
            }
        }

        if let Some(token) = self.settings.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }

        if let Some(path) = &self.settings.token_file {
            if let Ok(contents) = tokio::fs::read_to_string(path).await {
                let token = contents.trim();
                if !token.is_empty() {
                    return Ok(Secret::new(token));
                }
            }
        }

        Err(StoreError::Authorization {
            message: "no valid Vault auth method found".to_string(),
        })
    }

    async fn login_approle(&self, role_id: &str) -> Result<Secret, StoreError> {
        let mut body = Map::new();
        body.insert("role_id".to_string(), Value::String(role_id.to_string()));
        if let Some(secret_id) = &self.settings.secret_id {
            body.insert(
                "secret_id".to_string(),
                Value::String(secret_id.expose().to_string()),
            );
        }

        let response = self
            .request(Method::POST, "auth/approle/login")?
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Authorization {
                message: format!("AppRole login request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::Authorization {
                message: format!("AppRole login returned {}", response.status()),
            });
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            StoreError::Authorization {
                message: format!("decoding AppRole login response: {}", e),
            }
        })?;

        login
            .auth
            .map(|auth| Secret::new(auth.client_token))
            .ok_or_else(|| StoreError::Authorization {
                message: "AppRole login returned no auth block".to_string(),
            })
    }

    /// Read the secret's data map; `None` if the key holds nothing.
    async fn read(&self, token: &Secret) -> Result<Option<Map<String, Value>>, StoreError> {
        let response = self
            .request(Method::GET, &self.key)?
            .header("X-Vault-Token", token.expose())
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("reading Vault key {}: {}", self.key, e),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::FORBIDDEN => {
                return Err(StoreError::Authorization {
                    message: format!("permission denied reading {}", self.key),
                });
            }
            status if !status.is_success() => {
                return Err(StoreError::Backend {
                    message: format!("reading Vault key {}: status {}", self.key, status),
                });
            }
            _ => {}
        }

        let secret: SecretResponse = response.json().await.map_err(|e| StoreError::Backend {
            message: format!("decoding Vault key {}: {}", self.key, e),
        })?;

        Ok(secret.data)
    }

    async fn write(&self, token: &Secret, data: &Map<String, Value>) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, &self.key)?
            .header("X-Vault-Token", token.expose())
            .json(data)
            .send()
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("writing Vault key {}: {}", self.key, e),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::Backend {
                message: format!(
                    "writing Vault key {}: status {}",
                    self.key,
                    response.status()
                ),
            });
        }

        Ok(())
    }

    fn not_found(&self) -> StoreError {
        StoreError::NotFound {
            location: format!("vault:{}", self.key),
        }
    }
}

fn string_field<'a>(data: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    data.get(field).and_then(Value::as_str)
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("address", &self.settings.address)
            .field("key", &self.key)
            .finish()
    }
}

#[async_trait]
impl CredentialStore for VaultStore {
    async fn client_credentials(&self) -> Result<ClientCredentials, StoreError> {
        let token = self.authorize().await?;
        let data = self.read(&token).await?.ok_or_else(|| StoreError::Configuration {
            message: format!("no data found at Vault key {}", self.key),
        })?;

        let client_id = string_field(&data, FIELD_CLIENT_ID).unwrap_or_default();
        let client_secret =
            Secret::new(string_field(&data, FIELD_CLIENT_SECRET).unwrap_or_default());

        require_client_credentials(client_id, &client_secret)
    }

    async fn token(&self) -> Result<StoredToken, StoreError> {
        let token = self.authorize().await?;
        let data = self.read(&token).await?.ok_or_else(|| self.not_found())?;

        let (Some(access), Some(refresh), Some(expiry)) = (
            string_field(&data, FIELD_ACCESS_TOKEN),
            string_field(&data, FIELD_REFRESH_TOKEN),
            string_field(&data, FIELD_EXPIRY),
        ) else {
            return Err(self.not_found());
        };

        let expiry = DateTime::parse_from_rfc3339(expiry)
            .map_err(|e| StoreError::Backend {
                message: format!("parsing stored expiry: {}", e),
            })?
            .with_timezone(&Utc);

        Ok(StoredToken::new(access, refresh, expiry))
    }

    async fn update_token(&self, token: &StoredToken) -> Result<(), StoreError> {
        let vault_token = self.authorize().await?;
        let mut data = self.read(&vault_token).await?.ok_or_else(|| StoreError::Backend {
            message: format!("no data found at Vault key {}", self.key),
        })?;

        data.insert(
            FIELD_ACCESS_TOKEN.to_string(),
            Value::String(token.access_token.expose().to_string()),
        );
        data.insert(
            FIELD_REFRESH_TOKEN.to_string(),
            Value::String(token.refresh_token.expose().to_string()),
        );
        data.insert(
            FIELD_EXPIRY.to_string(),
            Value::String(token.expiry.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );

        self.write(&vault_token, &data).await?;

        tracing::debug!(key = %self.key, "stored token in Vault");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> VaultSettings {
        VaultSettings {
            address: server.uri(),
            token: Some(Secret::new("static-token")),
            ..Default::default()
        }
    }

    fn full_secret() -> serde_json::Value {
        serde_json::json!({
            "data": {
                "client-id": "cid",
                "client-secret": "csecret",
                "access-token": "access",
                "refresh-token": "refresh",
                "expiry": "2024-05-01T12:00:00.123456789Z"
            }
        })
    }

    #[tokio::test]
    async fn test_reads_client_credentials_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/byocar"))
            .and(header("X-Vault-Token", "static-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_secret()))
            .mount(&server)
            .await;

        let store = VaultStore::with_settings(settings(&server), "secret/byocar").unwrap();

        let creds = store.client_credentials().await.unwrap();
        assert_eq!(creds.client_id, "cid");
        assert_eq!(creds.client_secret.expose(), "csecret");

        let token = store.token().await.unwrap();
        assert_eq!(token.access_token.expose(), "access");
        assert_eq!(token.refresh_token.expose(), "refresh");
        assert_eq!(
            token.expiry,
            "2024-05-01T12:00:00.123456789Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(store.has_credentials().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_token_fields_mean_no_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/byocar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "client-id": "cid", "client-secret": "csecret" }
            })))
            .mount(&server)
            .await;

        let store = VaultStore::with_settings(settings(&server), "secret/byocar").unwrap();

        assert!(matches!(store.token().await, Err(StoreError::NotFound { .. })));
        assert!(!store.has_credentials().await.unwrap());
    }

    #[tokio::test]
    async fn test_update_token_keeps_client_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/byocar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "client-id": "cid", "client-secret": "csecret" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/secret/byocar"))
            .and(body_json(serde_json::json!({
                "client-id": "cid",
                "client-secret": "csecret",
                "access-token": "new-access",
                "refresh-token": "new-refresh",
                "expiry": "2024-05-01T12:00:00.500Z"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = VaultStore::with_settings(settings(&server), "secret/byocar").unwrap();
        let expiry = "2024-05-01T12:00:00.5Z".parse().unwrap();

        store
            .update_token(&StoredToken::new("new-access", "new-refresh", expiry))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_approle_login_takes_priority() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .and(body_json(serde_json::json!({ "role_id": "role", "secret_id": "sid" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "auth": { "client_token": "approle-token" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/byocar"))
            .and(header("X-Vault-Token", "approle-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_secret()))
            .expect(1)
            .mount(&server)
            .await;

        let store = VaultStore::with_settings(
            VaultSettings {
                role_id: Some("role".to_string()),
                secret_id: Some(Secret::new("sid")),
                ..settings(&server)
            },
            "secret/byocar",
        )
        .unwrap();

        assert!(store.token().await.is_ok());
    }

    #[tokio::test]
    async fn test_token_file_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/byocar"))
            .and(header("X-Vault-Token", "file-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_secret()))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let token_file = dir.path().join(".vault-token");
        std::fs::write(&token_file, "file-token\n").unwrap();

        let store = VaultStore::with_settings(
            VaultSettings {
                address: server.uri(),
                token_file: Some(token_file),
                ..Default::default()
            },
            "secret/byocar",
        )
        .unwrap();

        assert!(store.token().await.is_ok());
    }

    #[tokio::test]
    async fn test_no_auth_method_is_authorization_error() {
        let server = MockServer::start().await;
        let store = VaultStore::with_settings(
            VaultSettings {
                address: server.uri(),
                ..Default::default()
            },
            "secret/byocar",
        )
        .unwrap();

        assert!(matches!(
            store.token().await,
            Err(StoreError::Authorization { .. })
        ));
        assert!(store.has_credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error_for_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secret/byocar"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = VaultStore::with_settings(settings(&server), "secret/byocar").unwrap();

        assert!(matches!(
            store.client_credentials().await,
            Err(StoreError::Configuration { .. })
        ));
        assert!(!store.has_credentials().await.unwrap());
    }
}
