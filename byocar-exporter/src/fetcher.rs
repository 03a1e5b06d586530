//! Periodic polling of every configured vehicle.

use std::sync::Arc;
use std::time::Duration;

use byocar_core::{ClientError, VehicleDataClient};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::exporter::Exporter;

/// Polls the vehicle data API and hands results to the exporters.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn VehicleDataClient>,
    exporter: Arc<dyn Exporter>,
    vehicle_ids: Arc<[String]>,
}

impl Fetcher {
    pub fn new(
        client: Arc<dyn VehicleDataClient>,
        exporter: Arc<dyn Exporter>,
        vehicle_ids: Vec<String>,
    ) -> Self {
        Self {
            client,
            exporter,
            vehicle_ids: vehicle_ids.into(),
        }
    }

    /// Fetch immediately, then every `period` until `shutdown` flips to true.
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => self.fetch_all().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("fetcher stopped");
                        return;
                    }
                }
            }
        }
    }

    /// Poll all vehicles concurrently, one task per vehicle.
    pub async fn fetch_all(&self) {
        let mut tasks = JoinSet::new();

        for vehicle_id in self.vehicle_ids.iter().cloned() {
            let fetcher = self.clone();
            tasks.spawn(async move { fetcher.fetch_vehicle(&vehicle_id).await });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "vehicle fetch task failed");
            }
        }
    }

    /// Poll all five containers of one vehicle.
    ///
    /// A failing container is logged and skipped; the others still run.
    pub async fn fetch_vehicle(&self, vehicle_id: &str) {
        info!(vehicle_id, "fetching data");

        let result = self.client.get_pay_as_you_drive_insurance(vehicle_id).await;
        handle(vehicle_id, "pay-as-you-drive", result, |s| {
            self.exporter.set_pay_as_you_drive(vehicle_id, s)
        });

        let result = self.client.get_fuel_status(vehicle_id).await;
        handle(vehicle_id, "fuel-status", result, |s| {
            self.exporter.set_fuel_status(vehicle_id, s)
        });

        let result = self.client.get_vehicle_status(vehicle_id).await;
        handle(vehicle_id, "vehicle-status", result, |s| {
            self.exporter.set_vehicle_status(vehicle_id, s)
        });

        let result = self.client.get_lock_status(vehicle_id).await;
        handle(vehicle_id, "lock-status", result, |s| {
            self.exporter.set_lock_status(vehicle_id, s)
        });

        let result = self.client.get_electric_status(vehicle_id).await;
        handle(vehicle_id, "electric-status", result, |s| {
            self.exporter.set_electric_status(vehicle_id, s)
        });

        info!(vehicle_id, "data updated");
    }
}

fn handle<T>(
    vehicle_id: &str,
    domain: &str,
    result: Result<T, ClientError>,
    submit: impl FnOnce(&T),
) {
    match result {
        Ok(status) => submit(&status),
        Err(ClientError::NoDataAvailable) => {
            warn!(vehicle_id, "{} data is not available", domain);
        }
        Err(e) => {
            error!(vehicle_id, error = %e, "fetching {} data", domain);
        }
    }
}
