//! Prometheus gauges for the status bundles.

use byocar_core::{
    ElectricStatus, FuelStatus, LockStatus, MetricValue, PayAsYouDriveInsurance, VehicleStatus,
};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use super::{
    Exporter, LABEL_DOOR, LABEL_LIGHT, LABEL_VEHICLE_ID, LABEL_WINDOW, SUBSYSTEM_ELECTRIC_STATUS,
    SUBSYSTEM_FUEL_STATUS, SUBSYSTEM_LOCK_STATUS, SUBSYSTEM_PAY_AS_YOU_DRIVE,
    SUBSYSTEM_VEHICLE_STATUS,
};

pub const METRICS_NAMESPACE: &str = "mercedes_byocar";

/// Exports status bundles as `mercedes_byocar_*` gauges.
///
/// All families are registered on the registry passed to [`new`](Self::new);
/// nothing touches the process-global default registry.
pub struct PrometheusExporter {
    electric_range: GaugeVec,
    electric_soc: GaugeVec,

    fuel_range_liquid: GaugeVec,
    fuel_tank_level_percent: GaugeVec,

    lock_deck_lid_unlocked: GaugeVec,
    lock_vehicle_status: GaugeVec,
    lock_gas_lid_unlocked: GaugeVec,
    lock_heading: GaugeVec,

    payd_odometer: GaugeVec,

    vehicle_deck_lid_open: GaugeVec,
    vehicle_door_open: GaugeVec,
    vehicle_interior_light: GaugeVec,
    vehicle_light_switch: GaugeVec,
    vehicle_reading_lamp_on: GaugeVec,
    vehicle_roof_top_status: GaugeVec,
    vehicle_sun_roof_status: GaugeVec,
    vehicle_window_status: GaugeVec,
}

fn register_gauge(
    registry: &Registry,
    subsystem: &str,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let opts = Opts::new(name, help)
        .namespace(METRICS_NAMESPACE)
        .subsystem(subsystem);
    let gauge = GaugeVec::new(opts, labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl PrometheusExporter {
    /// Register all gauge families in `registry`.
    ///
    /// Fails if any family is already registered there.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let vehicle = &[LABEL_VEHICLE_ID][..];

        Ok(Self {
            electric_range: register_gauge(
                registry,
                SUBSYSTEM_ELECTRIC_STATUS,
                "electric_range",
                "Electric range - 0..2046 km",
                vehicle,
            )?,
            electric_soc: register_gauge(
                registry,
                SUBSYSTEM_ELECTRIC_STATUS,
                "state_of_charge",
                "Displayed state of charge for the HV battery - 0..100 %",
                vehicle,
            )?,

            fuel_range_liquid: register_gauge(
                registry,
                SUBSYSTEM_FUEL_STATUS,
                "range_liquid",
                "Liquid fuel tank range - 0..2046 km",
                vehicle,
            )?,
            fuel_tank_level_percent: register_gauge(
                registry,
                SUBSYSTEM_FUEL_STATUS,
                "tanklevel_percent",
                "Liquid fuel tank level - 0..100 %",
                vehicle,
            )?,

            lock_deck_lid_unlocked: register_gauge(
                registry,
                SUBSYSTEM_LOCK_STATUS,
                "deck_lid_unlocked",
                "Lock status of the deck lid - 1 = unlocked",
                vehicle,
            )?,
            lock_vehicle_status: register_gauge(
                registry,
                SUBSYSTEM_LOCK_STATUS,
                "vehicle_status",
                "Vehicle lock status - 0 = unlocked, 1 = internal locked, \
                 2 = external locked, 3 = selective unlocked",
                vehicle,
            )?,
            lock_gas_lid_unlocked: register_gauge(
                registry,
                SUBSYSTEM_LOCK_STATUS,
                "gas_lid_unlocked",
                "Status of gas tank door lock - 1 = unlocked",
                vehicle,
            )?,
            lock_heading: register_gauge(
                registry,
                SUBSYSTEM_LOCK_STATUS,
                "heading",
                "Vehicle heading position - 0..359.9 degrees",
                vehicle,
            )?,

            payd_odometer: register_gauge(
                registry,
                SUBSYSTEM_PAY_AS_YOU_DRIVE,
                "odometer",
                "Odometer - 0..999999 km",
                vehicle,
            )?,

            vehicle_deck_lid_open: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "deck_lid_open",
                "Deck lid latch status opened/closed state - 1 = open",
                vehicle,
            )?,
            vehicle_door_open: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "door_open",
                "Status of respective door - 1 = open",
                &[LABEL_VEHICLE_ID, LABEL_DOOR],
            )?,
            vehicle_interior_light: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "interior_light_on",
                "Status of respective interior light - 1 = on",
                &[LABEL_VEHICLE_ID, LABEL_LIGHT],
            )?,
            vehicle_light_switch: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "light_switch_position",
                "Rotary light switch position - 0 = auto, 1 = headlights, \
                 2 = sidelight left, 3 = sidelight right, 4 = parking light",
                vehicle,
            )?,
            vehicle_reading_lamp_on: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "reading_lamp_on",
                "Status of respective reading lamp - 1 = on",
                &[LABEL_VEHICLE_ID, LABEL_LIGHT],
            )?,
            vehicle_roof_top_status: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "roof_top_status",
                "Status of the convertible top - 0 = unlocked, 1 = open and locked, \
                 2 = closed and locked",
                vehicle,
            )?,
            vehicle_sun_roof_status: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "sun_roof_status",
                "Status of the sunroof - 0 = Tilt/slide sunroof is closed, \
                 1 = Tilt/slide sunroof is complete open, 2 = Lifting roof is open, \
                 3 = Tilt/slide sunroof is running, \
                 4 = Tilt/slide sunroof in anti-booming position, \
                 5 = Sliding roof in intermediate position, \
                 6 = Lifting roof in intermediate position",
                vehicle,
            )?,
            vehicle_window_status: register_gauge(
                registry,
                SUBSYSTEM_VEHICLE_STATUS,
                "window_status",
                "Status of respective window - 0 = window in intermediate position, \
                 1 = window completely opened, 2 = window completely closed, \
                 3 = window airing position, 4 = window intermediate airing position, \
                 5 = window currently running",
                &[LABEL_VEHICLE_ID, LABEL_WINDOW],
            )?,
        })
    }
}

/// Render every family in `registry` in the text exposition format.
pub fn render_metrics(registry: &Registry) -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

fn set_gauge(value: &MetricValue, gauge: &GaugeVec, label_values: &[&str]) {
    if !value.is_valid() {
        return;
    }

    match gauge.get_metric_with_label_values(label_values) {
        Ok(metric) => metric.set(value.to_f64()),
        Err(e) => tracing::warn!(error = %e, "ignoring sample"),
    }
}

impl Exporter for PrometheusExporter {
    fn set_electric_status(&self, vehicle_id: &str, status: &ElectricStatus) {
        set_gauge(&status.electric_range, &self.electric_range, &[vehicle_id]);
        set_gauge(&status.state_of_charge, &self.electric_soc, &[vehicle_id]);
    }

    fn set_fuel_status(&self, vehicle_id: &str, status: &FuelStatus) {
        set_gauge(&status.range_liquid, &self.fuel_range_liquid, &[vehicle_id]);
        set_gauge(
            &status.tank_level_percent,
            &self.fuel_tank_level_percent,
            &[vehicle_id],
        );
    }

    fn set_lock_status(&self, vehicle_id: &str, status: &LockStatus) {
        set_gauge(
            &status.deck_lid_unlocked,
            &self.lock_deck_lid_unlocked,
            &[vehicle_id],
        );
        set_gauge(&status.vehicle_status, &self.lock_vehicle_status, &[vehicle_id]);
        set_gauge(
            &status.gas_lid_unlocked,
            &self.lock_gas_lid_unlocked,
            &[vehicle_id],
        );
        set_gauge(&status.heading, &self.lock_heading, &[vehicle_id]);
    }

    fn set_pay_as_you_drive(&self, vehicle_id: &str, status: &PayAsYouDriveInsurance) {
        set_gauge(&status.odometer, &self.payd_odometer, &[vehicle_id]);
    }

    fn set_vehicle_status(&self, vehicle_id: &str, status: &VehicleStatus) {
        set_gauge(&status.deck_lid_open, &self.vehicle_deck_lid_open, &[vehicle_id]);

        for (value, door) in super::doors(status) {
            set_gauge(value, &self.vehicle_door_open, &[vehicle_id, door]);
        }

        for (value, light) in super::interior_lights(status) {
            set_gauge(value, &self.vehicle_interior_light, &[vehicle_id, light]);
        }

        set_gauge(
            &status.light_switch_position,
            &self.vehicle_light_switch,
            &[vehicle_id],
        );

        for (value, lamp) in super::reading_lamps(status) {
            set_gauge(value, &self.vehicle_reading_lamp_on, &[vehicle_id, lamp]);
        }

        set_gauge(
            &status.roof_top_status,
            &self.vehicle_roof_top_status,
            &[vehicle_id],
        );
        set_gauge(
            &status.sun_roof_status,
            &self.vehicle_sun_roof_status,
            &[vehicle_id],
        );

        for (value, window) in super::windows(status) {
            set_gauge(value, &self.vehicle_window_status, &[vehicle_id, window]);
        }
    }
}
