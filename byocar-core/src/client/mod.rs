//! Vehicle data API client.
//!
//! [`ApiClient`] drives the whole credential lifecycle:
//!
//! 1. [`get_auth_start_url`](VehicleDataClient::get_auth_start_url) issues a
//!    state token and returns the vendor login URL
//! 2. [`store_token_from_request`](VehicleDataClient::store_token_from_request)
//!    validates the callback and exchanges the code for a token pair
//! 3. every getter loads the token from the [`CredentialStore`], refreshes it
//!    when it is within the grace window, requests the container and decodes
//!    the response into a status bundle
//!
//! Nothing is retried; every failure is returned to the caller.

mod oauth;

pub use oauth::SCOPES;

use async_trait::async_trait;
use chrono::Duration;
use oauth2::{reqwest::async_http_client, AuthorizationCode, CsrfToken, RefreshToken, Scope};
use parking_lot::Mutex;
use reqwest::{header::ACCEPT, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::decode::{decode, DecodeError, StatusBundle};
use crate::status::{
    ElectricStatus, FuelStatus, LockStatus, PayAsYouDriveInsurance, VehicleStatus,
};
use crate::store::{ClientCredentials, CredentialStore, StoreError, StoredToken};
use oauth::{create_oauth_client, stored_token_from_response, PendingState};

/// Timeout for every request to the vendor.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// How long an issued state token stays valid, in minutes.
pub const STATE_VALIDITY_MINUTES: i64 = 5;

/// Tokens expiring within this many minutes are refreshed before use.
pub const TOKEN_GRACE_MINUTES: i64 = 5;

const API_ACCEPT: &str = "application/json;charset=utf-8";

/// Error type for API client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Static configuration (URLs) is invalid.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The authorization callback was rejected.
    #[error("authorization failed: {message}")]
    Authorization { message: String },

    /// Exchanging the authorization code failed.
    #[error("exchanging code for token: {message}")]
    Exchange { message: String },

    /// Refreshing the access token failed.
    #[error("renewing token: {message}")]
    Refresh { message: String },

    /// The telemetry endpoint answered with a non-success status.
    #[error("http status code {status}, body {body}")]
    Api { status: u16, body: String },

    /// The vehicle has no data for the requested container.
    #[error("no data available")]
    NoDataAvailable,

    /// The telemetry request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The telemetry request failed in transport.
    #[error("executing request: {message}")]
    Network { message: String },

    /// The telemetry response could not be decoded.
    #[error("decoding output: {0}")]
    Decode(#[from] DecodeError),

    /// The credential store failed.
    #[error("credential store: {0}")]
    Store(#[from] StoreError),
}

/// Vendor endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for VendorEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://ssoalpha.dvb.corpinter.net/v1/auth".to_string(),
            token_url: "https://ssoalpha.dvb.corpinter.net/v1/token".to_string(),
            api_base: "https://api.mercedes-benz.com/vehicledata/v2".to_string(),
        }
    }
}

/// Query parameters the vendor appends to the redirect URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Read-only access to the vehicle data API.
#[async_trait]
pub trait VehicleDataClient: Send + Sync {
    /// Start an authorization flow, superseding any flow in progress.
    fn get_auth_start_url(&self, redirect_url: &str) -> Result<String, ClientError>;

    /// Finish the authorization flow and persist the issued tokens.
    async fn store_token_from_request(
        &self,
        redirect_url: &str,
        params: &CallbackParams,
    ) -> Result<(), ClientError>;

    async fn get_fuel_status(&self, vehicle_id: &str) -> Result<FuelStatus, ClientError>;

    async fn get_lock_status(&self, vehicle_id: &str) -> Result<LockStatus, ClientError>;

    async fn get_vehicle_status(&self, vehicle_id: &str) -> Result<VehicleStatus, ClientError>;

    async fn get_electric_status(&self, vehicle_id: &str) -> Result<ElectricStatus, ClientError>;

    async fn get_pay_as_you_drive_insurance(
        &self,
        vehicle_id: &str,
    ) -> Result<PayAsYouDriveInsurance, ClientError>;
}

/// Default implementation of [`VehicleDataClient`].
///
/// Holds no per-vehicle state; one instance serves every configured vehicle.
/// Only one authorization flow can be pending at a time.
pub struct ApiClient<S: CredentialStore> {
    credentials: ClientCredentials,
    store: S,
    endpoints: VendorEndpoints,
    http_client: reqwest::Client,
    request_timeout: std::time::Duration,
    state_validity: Duration,
    token_grace: Duration,
    pending_state: Mutex<Option<PendingState>>,
}

impl<S: CredentialStore> ApiClient<S> {
    /// Create a client for the production vendor endpoints.
    pub fn new(credentials: ClientCredentials, store: S) -> Self {
        Self::with_endpoints(credentials, store, VendorEndpoints::default())
    }

    /// Create a client for custom endpoints.
    pub fn with_endpoints(
        credentials: ClientCredentials,
        store: S,
        endpoints: VendorEndpoints,
    ) -> Self {
        Self {
            credentials,
            store,
            endpoints,
            http_client: reqwest::Client::new(),
            request_timeout: REQUEST_TIMEOUT,
            state_validity: Duration::minutes(STATE_VALIDITY_MINUTES),
            token_grace: Duration::minutes(TOKEN_GRACE_MINUTES),
            pending_state: Mutex::new(None),
        }
    }

    /// Override the validity window of issued state tokens.
    pub fn with_state_validity(mut self, validity: Duration) -> Self {
        self.state_validity = validity;
        self
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The credential store backing this client.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the stored token, refreshing it if it is about to expire.
    ///
    /// The refreshed triple is written back only if it differs from the
    /// stored one.
    async fn current_token(&self) -> Result<StoredToken, ClientError> {
        let stored = self.store.token().await?;

        if !stored.expires_within(self.token_grace) {
            return Ok(stored);
        }

        tracing::info!(expiry = %stored.expiry, "access token expires soon, refreshing");

        let refreshed = self.refresh_token(&stored).await?;
        if refreshed != stored {
            self.store.update_token(&refreshed).await?;
            tracing::info!(expiry = %refreshed.expiry, "stored refreshed token");
        } else {
            tracing::debug!("refresh returned the stored token, skipping update");
        }

        Ok(refreshed)
    }

    async fn refresh_token(&self, stored: &StoredToken) -> Result<StoredToken, ClientError> {
        let client = create_oauth_client(&self.endpoints, &self.credentials, None)?;
        let refresh_token = RefreshToken::new(stored.refresh_token.expose().to_string());

        let response = tokio::time::timeout(
            self.request_timeout,
            client
                .exchange_refresh_token(&refresh_token)
                .request_async(async_http_client),
        )
        .await
        .map_err(|_| ClientError::Refresh {
            message: "token endpoint timed out".to_string(),
        })?
        .map_err(|e| ClientError::Refresh {
            message: e.to_string(),
        })?;

        stored_token_from_response(&response, Some(stored)).map_err(|e| ClientError::Refresh {
            message: e.to_string(),
        })
    }

    /// Fetch and decode one telemetry container.
    async fn fetch<T: StatusBundle>(&self, vehicle_id: &str) -> Result<T, ClientError> {
        let url = container_url(&self.endpoints.api_base, vehicle_id, T::CONTAINER)?;

        let token = self.current_token().await?;

        tracing::debug!(url = %url, "requesting {}", T::NAME);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token.access_token.expose())
            .header(ACCEPT, API_ACCEPT)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ClientError::NoDataAvailable);
        }

        if !status.is_success() {
            let body = response.text().await.map_err(transport_error)?;
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        Ok(decode(&body)?)
    }
}

/// `<api_base>/vehicles/<vehicle_id>/containers/<container>`, with each
/// segment percent-encoded.
fn container_url(api_base: &str, vehicle_id: &str, container: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(api_base).map_err(|e| ClientError::Configuration {
        message: format!("invalid API base URL {:?}: {}", api_base, e),
    })?;

    url.path_segments_mut()
        .map_err(|_| ClientError::Configuration {
            message: format!("API base URL {:?} cannot carry a path", api_base),
        })?
        .pop_if_empty()
        .push("vehicles")
        .push(vehicle_id)
        .push("containers")
        .push(container);

    Ok(url)
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Network {
            message: e.to_string(),
        }
    }
}

impl<S: CredentialStore> std::fmt::Debug for ApiClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("client_id", &self.credentials.client_id)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> VehicleDataClient for ApiClient<S> {
    fn get_auth_start_url(&self, redirect_url: &str) -> Result<String, ClientError> {
        let client = create_oauth_client(&self.endpoints, &self.credentials, Some(redirect_url))?;

        let state = PendingState::generate(self.state_validity);
        let csrf = CsrfToken::new(state.value().to_string());

        let (url, _) = client
            .authorize_url(move || csrf)
            .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .url();

        *self.pending_state.lock() = Some(state);

        tracing::debug!("issued new authorization state");

        Ok(url.to_string())
    }

    async fn store_token_from_request(
        &self,
        redirect_url: &str,
        params: &CallbackParams,
    ) -> Result<(), ClientError> {
        let accepted = self
            .pending_state
            .lock()
            .as_ref()
            .is_some_and(|pending| pending.accepts(&params.state));
        if !accepted {
            return Err(ClientError::Authorization {
                message: "invalid or expired state".to_string(),
            });
        }

        if let Some(error) = &params.error {
            return Err(ClientError::Authorization {
                message: format!("provider returned error: {}", error),
            });
        }

        let client = create_oauth_client(&self.endpoints, &self.credentials, Some(redirect_url))?;

        let response = tokio::time::timeout(
            self.request_timeout,
            client
                .exchange_code(AuthorizationCode::new(params.code.clone()))
                .add_extra_param("access_type", "offline")
                .request_async(async_http_client),
        )
        .await
        .map_err(|_| ClientError::Exchange {
            message: "token endpoint timed out".to_string(),
        })?
        .map_err(|e| ClientError::Exchange {
            message: e.to_string(),
        })?;

        let token = stored_token_from_response(&response, None)?;
        self.store.update_token(&token).await?;

        // Consume the state unless a newer flow replaced it meanwhile.
        {
            let mut pending = self.pending_state.lock();
            if pending.as_ref().is_some_and(|p| p.value() == params.state) {
                *pending = None;
            }
        }

        tracing::info!("stored token from authorization callback");

        Ok(())
    }

    async fn get_fuel_status(&self, vehicle_id: &str) -> Result<FuelStatus, ClientError> {
        self.fetch(vehicle_id).await
    }

    async fn get_lock_status(&self, vehicle_id: &str) -> Result<LockStatus, ClientError> {
        self.fetch(vehicle_id).await
    }

    async fn get_vehicle_status(&self, vehicle_id: &str) -> Result<VehicleStatus, ClientError> {
        self.fetch(vehicle_id).await
    }

    async fn get_electric_status(&self, vehicle_id: &str) -> Result<ElectricStatus, ClientError> {
        self.fetch(vehicle_id).await
    }

    async fn get_pay_as_you_drive_insurance(
        &self,
        vehicle_id: &str,
    ) -> Result<PayAsYouDriveInsurance, ClientError> {
        self.fetch(vehicle_id).await
    }
}
