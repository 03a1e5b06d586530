//! Exporter sinks for decoded status bundles.

mod influx;
mod prometheus;

pub use self::influx::{InfluxError, InfluxExporter, FLUSH_INTERVAL, FLUSH_TIMEOUT};
pub use self::prometheus::{render_metrics, PrometheusExporter, METRICS_NAMESPACE};

use std::sync::Arc;

use byocar_core::{
    ElectricStatus, FuelStatus, LockStatus, MetricValue, PayAsYouDriveInsurance, VehicleStatus,
};

const LABEL_VEHICLE_ID: &str = "vehicle_id";
const LABEL_DOOR: &str = "door";
const LABEL_LIGHT: &str = "light";
const LABEL_WINDOW: &str = "window";

const SUBSYSTEM_ELECTRIC_STATUS: &str = "electric_status";
const SUBSYSTEM_FUEL_STATUS: &str = "fuel_status";
const SUBSYSTEM_LOCK_STATUS: &str = "lock_status";
const SUBSYSTEM_PAY_AS_YOU_DRIVE: &str = "pay_as_you_drive";
const SUBSYSTEM_VEHICLE_STATUS: &str = "vehicle_status";

fn doors(status: &VehicleStatus) -> [(&MetricValue, &'static str); 4] {
    [
        (&status.door_front_left_open, "front_left"),
        (&status.door_front_right_open, "front_right"),
        (&status.door_rear_left_open, "rear_left"),
        (&status.door_rear_right_open, "rear_right"),
    ]
}

fn interior_lights(status: &VehicleStatus) -> [(&MetricValue, &'static str); 2] {
    [
        (&status.interior_lights_front_on, "front"),
        (&status.interior_lights_rear_on, "rear"),
    ]
}

fn reading_lamps(status: &VehicleStatus) -> [(&MetricValue, &'static str); 2] {
    [
        (&status.reading_lamp_front_left_on, "front_left"),
        (&status.reading_lamp_front_right_on, "front_right"),
    ]
}

fn windows(status: &VehicleStatus) -> [(&MetricValue, &'static str); 4] {
    [
        (&status.window_status_front_left, "front_left"),
        (&status.window_status_front_right, "front_right"),
        (&status.window_status_rear_left, "rear_left"),
        (&status.window_status_rear_right, "rear_right"),
    ]
}

/// A sink receiving the latest status bundles of a vehicle.
///
/// Implementations must skip invalid (absent) values.
pub trait Exporter: Send + Sync {
    fn set_electric_status(&self, vehicle_id: &str, status: &ElectricStatus);

    fn set_fuel_status(&self, vehicle_id: &str, status: &FuelStatus);

    fn set_lock_status(&self, vehicle_id: &str, status: &LockStatus);

    fn set_pay_as_you_drive(&self, vehicle_id: &str, status: &PayAsYouDriveInsurance);

    fn set_vehicle_status(&self, vehicle_id: &str, status: &VehicleStatus);
}

/// Fans every bundle out to each configured exporter, in order.
#[derive(Clone, Default)]
pub struct ExporterSet {
    exporters: Vec<Arc<dyn Exporter>>,
}

impl ExporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exporter to the set.
    pub fn with(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }
}

impl Exporter for ExporterSet {
    fn set_electric_status(&self, vehicle_id: &str, status: &ElectricStatus) {
        for exporter in &self.exporters {
            exporter.set_electric_status(vehicle_id, status);
        }
    }

    fn set_fuel_status(&self, vehicle_id: &str, status: &FuelStatus) {
        for exporter in &self.exporters {
            exporter.set_fuel_status(vehicle_id, status);
        }
    }

    fn set_lock_status(&self, vehicle_id: &str, status: &LockStatus) {
        for exporter in &self.exporters {
            exporter.set_lock_status(vehicle_id, status);
        }
    }

    fn set_pay_as_you_drive(&self, vehicle_id: &str, status: &PayAsYouDriveInsurance) {
        for exporter in &self.exporters {
            exporter.set_pay_as_you_drive(vehicle_id, status);
        }
    }

    fn set_vehicle_status(&self, vehicle_id: &str, status: &VehicleStatus) {
        for exporter in &self.exporters {
            exporter.set_vehicle_status(vehicle_id, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byocar_core::Value;
    use chrono::Utc;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Exporter for Recorder {
        fn set_electric_status(&self, vehicle_id: &str, _: &ElectricStatus) {
            self.calls.lock().push(format!("electric:{}", vehicle_id));
        }

        fn set_fuel_status(&self, vehicle_id: &str, status: &FuelStatus) {
            self.calls
                .lock()
                .push(format!("fuel:{}:{}", vehicle_id, status.range_liquid.to_f64()));
        }

        fn set_lock_status(&self, vehicle_id: &str, _: &LockStatus) {
            self.calls.lock().push(format!("lock:{}", vehicle_id));
        }

        fn set_pay_as_you_drive(&self, vehicle_id: &str, _: &PayAsYouDriveInsurance) {
            self.calls.lock().push(format!("payd:{}", vehicle_id));
        }

        fn set_vehicle_status(&self, vehicle_id: &str, _: &VehicleStatus) {
            self.calls.lock().push(format!("vehicle:{}", vehicle_id));
        }
    }

    #[test]
    fn test_set_fans_out_to_every_exporter() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let set = ExporterSet::new().with(first.clone()).with(second.clone());
        assert_eq!(set.len(), 2);

        let fuel = FuelStatus {
            range_liquid: MetricValue::new(Value::Int(512), Utc::now()),
            ..Default::default()
        };
        set.set_fuel_status("WDB111111ZZZ22222", &fuel);
        set.set_lock_status("WDB111111ZZZ22222", &LockStatus::default());

        for recorder in [&first, &second] {
            assert_eq!(
                *recorder.calls.lock(),
                vec!["fuel:WDB111111ZZZ22222:512", "lock:WDB111111ZZZ22222"]
            );
        }
    }

    #[test]
    fn test_empty_set_is_a_no_op() {
        let set = ExporterSet::new();
        assert!(set.is_empty());
        set.set_vehicle_status("WDB111111ZZZ22222", &VehicleStatus::default());
    }
}
