//! OAuth 2.0 authorization code flow against the vendor SSO.

use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::{BasicClient, BasicTokenResponse},
    AuthType, AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenResponse, TokenUrl,
};

use super::{ClientError, VendorEndpoints};
use crate::store::{ClientCredentials, StoredToken};

/// Scopes requested on authorization: offline access for a refresh token,
/// plus one scope per telemetry container.
pub const SCOPES: &[&str] = &[
    "offline_access",
    "openid",
    "mb:vehicle:mbdata:payasyoudrive",
    "mb:vehicle:mbdata:evstatus",
    "mb:vehicle:mbdata:fuelstatus",
    "mb:vehicle:mbdata:vehiclelock",
    "mb:vehicle:mbdata:vehiclestatus",
];

/// Create an OAuth2 client for the vendor endpoints.
///
/// Client credentials are sent in the `Authorization` header.
pub(crate) fn create_oauth_client(
    endpoints: &VendorEndpoints,
    credentials: &ClientCredentials,
    redirect_uri: Option<&str>,
) -> Result<BasicClient, ClientError> {
    let auth_url = AuthUrl::new(endpoints.auth_url.clone()).map_err(|e| {
        ClientError::Configuration {
            message: format!("invalid auth URL: {}", e),
        }
    })?;

    let token_url = TokenUrl::new(endpoints.token_url.clone()).map_err(|e| {
        ClientError::Configuration {
            message: format!("invalid token URL: {}", e),
        }
    })?;

    let mut client = BasicClient::new(
        ClientId::new(credentials.client_id.clone()),
        Some(ClientSecret::new(
            credentials.client_secret.expose().to_string(),
        )),
        auth_url,
        Some(token_url),
    )
    .set_auth_type(AuthType::BasicAuth);

    if let Some(redirect) = redirect_uri {
        let redirect_url = RedirectUrl::new(redirect.to_string()).map_err(|e| {
            ClientError::Configuration {
                message: format!("invalid redirect URL: {}", e),
            }
        })?;
        client = client.set_redirect_uri(redirect_url);
    }

    Ok(client)
}

/// Build a token triple from a token endpoint response.
///
/// A response without a refresh token keeps the previous one; a response
/// without `expires_in` keeps the previous expiry, or expires immediately on
/// a first exchange so the next poll refreshes.
pub(crate) fn stored_token_from_response(
    response: &BasicTokenResponse,
    previous: Option<&StoredToken>,
) -> Result<StoredToken, ClientError> {
    let refresh_token = match (response.refresh_token(), previous) {
        (Some(token), _) => token.secret().to_string(),
        (None, Some(previous)) => previous.refresh_token.expose().to_string(),
        (None, None) => String::new(),
    };

    let expiry = match (response.expires_in(), previous) {
        (Some(expires_in), _) => {
            let lifetime = Duration::from_std(expires_in).map_err(|e| ClientError::Exchange {
                message: format!("invalid expiration duration: {}", e),
            })?;
            Utc::now() + lifetime
        }
        (None, Some(previous)) => previous.expiry,
        (None, None) => Utc::now(),
    };

    Ok(StoredToken::new(
        response.access_token().secret().to_string(),
        refresh_token,
        expiry,
    ))
}

/// The single-use state value of the authorization flow in progress.
#[derive(Debug, Clone)]
pub(crate) struct PendingState {
    value: String,
    expires_at: DateTime<Utc>,
}

impl PendingState {
    /// Generate a fresh random state valid for `validity`.
    pub(crate) fn generate(validity: Duration) -> Self {
        Self {
            value: uuid::Uuid::new_v4().to_string(),
            expires_at: Utc::now() + validity,
        }
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }

    /// Whether `state` matches and the window has not elapsed.
    pub(crate) fn accepts(&self, state: &str) -> bool {
        self.value == state && Utc::now() < self.expires_at
    }
}
