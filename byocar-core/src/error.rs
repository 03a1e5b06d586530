//! Top-level error types for byocar.

use thiserror::Error;

use crate::client::ClientError;
use crate::decode::DecodeError;
use crate::store::StoreError;

/// Top-level error type encompassing all byocar errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from credential storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the vehicle data API client.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Error decoding a telemetry response.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Whether the error only signals that the vehicle had nothing to report.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::Client(ClientError::NoDataAvailable))
    }
}
