//! Shared fakes for exporter integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use byocar_core::{
    CallbackParams, ClientError, ElectricStatus, FuelStatus, LockStatus, MetricValue,
    PayAsYouDriveInsurance, Value, VehicleDataClient, VehicleStatus,
};
use byocar_exporter::Exporter;
use chrono::Utc;
use parking_lot::Mutex;

pub const AUTH_URL: &str = "https://sso.example.com/v1/auth?state=fixed";

/// How a fake container request should fail.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NoData,
    Forbidden,
}

impl Failure {
    fn to_error(self) -> ClientError {
        match self {
            Failure::NoData => ClientError::NoDataAvailable,
            Failure::Forbidden => ClientError::Api {
                status: 403,
                body: "forbidden".to_string(),
            },
        }
    }
}

/// Vehicle data client answering from memory and recording every call.
#[derive(Default)]
pub struct FakeClient {
    pub reject_callbacks: bool,
    pub failures: HashMap<&'static str, Failure>,
    pub auth_requests: Mutex<Vec<String>>,
    pub callbacks: Mutex<Vec<(String, CallbackParams)>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn failing(domain: &'static str, failure: Failure) -> Self {
        let mut client = Self::default();
        client.failures.insert(domain, failure);
        client
    }

    fn record(&self, domain: &'static str, vehicle_id: &str) -> Result<(), ClientError> {
        self.requests.lock().push(format!("{}:{}", domain, vehicle_id));
        match self.failures.get(domain) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

pub fn int(v: i64) -> MetricValue {
    MetricValue::new(Value::Int(v), Utc::now())
}

#[async_trait]
impl VehicleDataClient for FakeClient {
    fn get_auth_start_url(&self, redirect_url: &str) -> Result<String, ClientError> {
        self.auth_requests.lock().push(redirect_url.to_string());
        Ok(AUTH_URL.to_string())
    }

    async fn store_token_from_request(
        &self,
        redirect_url: &str,
        params: &CallbackParams,
    ) -> Result<(), ClientError> {
        self.callbacks
            .lock()
            .push((redirect_url.to_string(), params.clone()));

        if self.reject_callbacks {
            return Err(ClientError::Authorization {
                message: "invalid or expired state".to_string(),
            });
        }
        Ok(())
    }

    async fn get_fuel_status(&self, vehicle_id: &str) -> Result<FuelStatus, ClientError> {
        self.record("fuel", vehicle_id)?;
        Ok(FuelStatus {
            range_liquid: int(512),
            tank_level_percent: int(64),
        })
    }

    async fn get_lock_status(&self, vehicle_id: &str) -> Result<LockStatus, ClientError> {
        self.record("lock", vehicle_id)?;
        Ok(LockStatus::default())
    }

    async fn get_vehicle_status(&self, vehicle_id: &str) -> Result<VehicleStatus, ClientError> {
        self.record("vehicle", vehicle_id)?;
        Ok(VehicleStatus::default())
    }

    async fn get_electric_status(&self, vehicle_id: &str) -> Result<ElectricStatus, ClientError> {
        self.record("electric", vehicle_id)?;
        Ok(ElectricStatus {
            state_of_charge: int(80),
            electric_range: int(250),
        })
    }

    async fn get_pay_as_you_drive_insurance(
        &self,
        vehicle_id: &str,
    ) -> Result<PayAsYouDriveInsurance, ClientError> {
        self.record("payd", vehicle_id)?;
        Ok(PayAsYouDriveInsurance { odometer: int(1042) })
    }
}

/// Exporter recording `domain:vehicle` for every bundle it receives.
#[derive(Default)]
pub struct RecordingExporter {
    pub received: Mutex<Vec<String>>,
}

impl RecordingExporter {
    fn push(&self, domain: &str, vehicle_id: &str) {
        self.received.lock().push(format!("{}:{}", domain, vehicle_id));
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }
}

impl Exporter for RecordingExporter {
    fn set_electric_status(&self, vehicle_id: &str, _: &ElectricStatus) {
        self.push("electric", vehicle_id);
    }

    fn set_fuel_status(&self, vehicle_id: &str, _: &FuelStatus) {
        self.push("fuel", vehicle_id);
    }

    fn set_lock_status(&self, vehicle_id: &str, _: &LockStatus) {
        self.push("lock", vehicle_id);
    }

    fn set_pay_as_you_drive(&self, vehicle_id: &str, _: &PayAsYouDriveInsurance) {
        self.push("payd", vehicle_id);
    }

    fn set_vehicle_status(&self, vehicle_id: &str, _: &VehicleStatus) {
        self.push("vehicle", vehicle_id);
    }
}
