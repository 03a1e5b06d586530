//! Status bundles for the five telemetry containers.
//!
//! Each bundle is declared with [`status_bundle!`], which generates the
//! struct, its binding table and the slot lookup used by
//! [`decode`](crate::decode::decode).

use crate::decode::{FieldBinding, StatusBundle};
use crate::metric::{MetricValue, ValueKind};

/// Declare a status bundle: struct fields, vendor field names and kinds.
macro_rules! status_bundle {
    (
        $(#[$meta:meta])*
        pub struct $name:ident ($label:literal, $container:literal) {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $kind:expr => $api:literal,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: MetricValue,
            )*
        }

        impl StatusBundle for $name {
            const NAME: &'static str = $label;
            const CONTAINER: &'static str = $container;
            const FIELDS: &'static [FieldBinding] = &[
                $(FieldBinding { api_field: $api, kind: $kind },)*
            ];

            fn slot_mut(&mut self, api_field: &str) -> Option<&mut MetricValue> {
                match api_field {
                    $($api => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

pub const VEHICLE_LOCK_STATES: &[&str] = &[
    "unlocked",
    "internal locked",
    "external locked",
    "selective unlocked",
];

pub const LIGHT_SWITCH_POSITIONS: &[&str] = &[
    "auto",
    "headlights",
    "sidelight left",
    "sidelight right",
    "parking light",
];

pub const ROOF_TOP_STATES: &[&str] = &["unlocked", "open and locked", "closed and locked"];

pub const SUN_ROOF_STATES: &[&str] = &[
    "Tilt/slide sunroof is closed",
    "Tilt/slide sunroof is complete open",
    "Lifting roof is open",
    "Tilt/slide sunroof is running",
    "Tilt/slide sunroof in anti-booming position",
    "Sliding roof in intermediate position",
    "Lifting roof in intermediate position",
];

pub const WINDOW_STATES: &[&str] = &[
    "window in intermediate position",
    "window completely opened",
    "window completely closed",
    "window airing position",
    "window intermediate airing position",
    "window currently running",
];

status_bundle! {
    /// Combustion fuel readings.
    pub struct FuelStatus("fuel status", "fuelstatus") {
        /// Liquid fuel tank range, 0..2046 km.
        range_liquid: ValueKind::Int => "rangeliquid",
        /// Liquid fuel tank level, 0..100 %.
        tank_level_percent: ValueKind::Int => "tanklevelpercent",
    }
}

status_bundle! {
    /// Lock state and heading.
    pub struct LockStatus("lock status", "vehiclelockstatus") {
        /// Deck lid lock; `true` means unlocked.
        deck_lid_unlocked: ValueKind::Bool => "doorlockstatusdecklid",
        vehicle_status: ValueKind::Enum(VEHICLE_LOCK_STATES) => "doorlockstatusvehicle",
        /// Gas tank door lock; `true` means unlocked.
        gas_lid_unlocked: ValueKind::Bool => "doorlockstatusgas",
        /// Vehicle heading, 0..359.9 degrees.
        heading: ValueKind::Float => "positionHeading",
    }
}

status_bundle! {
    /// Doors, lights, roof and windows.
    pub struct VehicleStatus("vehicle status", "vehiclestatus") {
        deck_lid_open: ValueKind::Bool => "decklidstatus",
        door_front_left_open: ValueKind::Bool => "doorstatusfrontleft",
        door_front_right_open: ValueKind::Bool => "doorstatusfrontright",
        door_rear_left_open: ValueKind::Bool => "doorstatusrearleft",
        door_rear_right_open: ValueKind::Bool => "doorstatusrearright",
        interior_lights_front_on: ValueKind::Bool => "interiorLightsFront",
        interior_lights_rear_on: ValueKind::Bool => "interiorLightsRear",
        light_switch_position: ValueKind::Enum(LIGHT_SWITCH_POSITIONS) => "lightswitchposition",
        reading_lamp_front_left_on: ValueKind::Bool => "readingLampFrontLeft",
        reading_lamp_front_right_on: ValueKind::Bool => "readingLampFrontRight",
        /// Convertible top.
        roof_top_status: ValueKind::Enum(ROOF_TOP_STATES) => "rooftopstatus",
        sun_roof_status: ValueKind::Enum(SUN_ROOF_STATES) => "sunroofstatus",
        window_status_front_left: ValueKind::Enum(WINDOW_STATES) => "windowstatusfrontleft",
        window_status_front_right: ValueKind::Enum(WINDOW_STATES) => "windowstatusfrontright",
        window_status_rear_left: ValueKind::Enum(WINDOW_STATES) => "windowstatusrearleft",
        window_status_rear_right: ValueKind::Enum(WINDOW_STATES) => "windowstatusrearright",
    }
}

status_bundle! {
    /// High-voltage battery readings.
    pub struct ElectricStatus("electric status", "electricvehicle") {
        /// Displayed state of charge, 0..100 %.
        state_of_charge: ValueKind::Int => "soc",
        /// Electric range, 0..2046 km.
        electric_range: ValueKind::Int => "rangeelectric",
    }
}

status_bundle! {
    /// Odometer reading for usage based insurance.
    pub struct PayAsYouDriveInsurance("pay-as-you-drive", "payasyoudrive") {
        /// Odometer, 0..999999 km.
        odometer: ValueKind::Int => "odo",
    }
}
