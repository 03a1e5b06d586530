//! # byocar core
//!
//! Credential lifecycle and telemetry decoding for the Mercedes-Benz
//! "bring your own car" vehicle data API.
//!
//! This crate provides:
//! - Credential stores holding the OAuth client identity and token pair
//!   (JSON file, HashiCorp Vault, in-memory)
//! - Typed, timestamped metric values and the five telemetry status bundles
//! - A table driven decoder for the vendor's array-of-maps responses
//! - The API client running the authorization code flow, refreshing tokens
//!   ahead of expiry and polling the telemetry containers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use byocar_core::{ApiClient, CredentialStore, FileStore, VehicleDataClient};
//!
//! async fn poll(vehicle_id: &str) -> Result<(), byocar_core::Error> {
//!     let store = FileStore::new("credentials.json", "client-id", "client-secret")?;
//!     let client = ApiClient::new(store.client_credentials().await?, store);
//!
//!     let fuel = client.get_fuel_status(vehicle_id).await?;
//!     if fuel.tank_level_percent.is_valid() {
//!         println!("tank level: {}", fuel.tank_level_percent);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod decode;
pub mod error;
pub mod metric;
pub mod status;
pub mod store;

pub use client::{
    ApiClient, CallbackParams, ClientError, VehicleDataClient, VendorEndpoints,
};

pub use decode::{decode, DecodeError, FieldBinding, StatusBundle};

pub use error::Error;

pub use metric::{MetricValue, Value, ValueKind};

pub use status::{
    ElectricStatus, FuelStatus, LockStatus, PayAsYouDriveInsurance, VehicleStatus,
};

pub use store::{
    ClientCredentials, CredentialStore, FileStore, MemoryStore, Secret, StoreError,
    StoredToken, VaultSettings, VaultStore,
};
