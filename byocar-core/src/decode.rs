//! Generic decoding of vendor telemetry responses.
//!
//! The vendor answers every container request with an array of single-key
//! maps:
//!
//! ```json
//! [
//!   { "rangeliquid": { "value": "420", "timestamp": 1700000000000 } },
//!   { "tanklevelpercent": { "value": "63", "timestamp": 1700000000000 } }
//! ]
//! ```
//!
//! Values are always strings; timestamps are milliseconds since the epoch.
//! A [`StatusBundle`] declares once which vendor field feeds which slot and
//! with which [`ValueKind`]; [`decode`] walks that table for any bundle.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::metric::{MetricValue, Value, ValueKind};

/// Error type for response decoding.
///
/// Any error aborts the whole bundle; partial bundles are never returned.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not an array of field maps.
    #[error("parsing JSON response: {0}")]
    Payload(#[from] serde_json::Error),

    /// A present field could not be parsed as its declared kind.
    #[error("parsing value for {field}: {value:?} is not a valid {kind}")]
    InvalidValue {
        field: String,
        kind: &'static str,
        value: String,
    },

    /// A present field carries a timestamp outside the representable range.
    #[error("parsing timestamp for {field}: {timestamp} is out of range")]
    InvalidTimestamp { field: String, timestamp: i64 },

    /// The binding table names a field the bundle has no slot for.
    #[error("no destination slot bound for {field}")]
    UnboundField { field: String },
}

/// One vendor field as delivered on the wire.
#[derive(Debug, Clone, Deserialize)]
struct RawField {
    value: String,
    timestamp: i64,
}

/// Decoded wire shape. `null` field objects count as absent.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RawResponse(Vec<HashMap<String, Option<RawField>>>);

impl RawResponse {
    /// First non-null entry for `field`, scanning maps in order.
    fn get(&self, field: &str) -> Option<&RawField> {
        self.0
            .iter()
            .find_map(|entry| entry.get(field).and_then(Option::as_ref))
    }
}

/// Association of a vendor field name with a value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub api_field: &'static str,
    pub kind: ValueKind,
}

/// A statically declared set of vendor fields for one telemetry domain.
pub trait StatusBundle: Default {
    /// Human readable domain name.
    const NAME: &'static str;

    /// Vendor container the bundle is fetched from.
    const CONTAINER: &'static str;

    /// The binding table walked by [`decode`].
    const FIELDS: &'static [FieldBinding];

    /// Destination slot for a vendor field.
    fn slot_mut(&mut self, api_field: &str) -> Option<&mut MetricValue>;
}

/// Decode a response body into a status bundle.
///
/// Fields missing from the body are left invalid. A present field that
/// fails to parse aborts the decode.
pub fn decode<T: StatusBundle>(body: &[u8]) -> Result<T, DecodeError> {
    let response: RawResponse = serde_json::from_slice(body)?;
    let mut bundle = T::default();

    for binding in T::FIELDS {
        let value = match response.get(binding.api_field) {
            Some(raw) => decode_field(binding, raw)?,
            None => MetricValue::unset(binding.kind),
        };

        let slot = bundle
            .slot_mut(binding.api_field)
            .ok_or_else(|| DecodeError::UnboundField {
                field: binding.api_field.to_string(),
            })?;
        *slot = value;
    }

    Ok(bundle)
}

fn decode_field(binding: &FieldBinding, raw: &RawField) -> Result<MetricValue, DecodeError> {
    let invalid = || DecodeError::InvalidValue {
        field: binding.api_field.to_string(),
        kind: binding.kind.name(),
        value: raw.value.clone(),
    };

    let text = raw.value.as_str();
    let value = match binding.kind {
        ValueKind::Bool => Value::Bool(parse_bool(text).ok_or_else(invalid)?),
        ValueKind::Enum(labels) => Value::Enum {
            index: text.parse().map_err(|_| invalid())?,
            labels,
        },
        ValueKind::Float => Value::Float(text.parse().map_err(|_| invalid())?),
        ValueKind::Int => Value::Int(text.parse().map_err(|_| invalid())?),
    };

    let observed_at = DateTime::<Utc>::from_timestamp_millis(raw.timestamp).ok_or_else(|| {
        DecodeError::InvalidTimestamp {
            field: binding.api_field.to_string(),
            timestamp: raw.timestamp,
        }
    })?;

    Ok(MetricValue::new(value, observed_at))
}

/// Boolean literals as the vendor emits them.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK_LABELS: &[&str] = &["unlocked", "internal locked", "external locked"];

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        open: MetricValue,
        lock: MetricValue,
        heading: MetricValue,
        range: MetricValue,
    }

    impl StatusBundle for Sample {
        const NAME: &'static str = "sample";
        const CONTAINER: &'static str = "sample";
        const FIELDS: &'static [FieldBinding] = &[
            FieldBinding {
                api_field: "open",
                kind: ValueKind::Bool,
            },
            FieldBinding {
                api_field: "lock",
                kind: ValueKind::Enum(LOCK_LABELS),
            },
            FieldBinding {
                api_field: "heading",
                kind: ValueKind::Float,
            },
            FieldBinding {
                api_field: "range",
                kind: ValueKind::Int,
            },
        ];

        fn slot_mut(&mut self, api_field: &str) -> Option<&mut MetricValue> {
            match api_field {
                "open" => Some(&mut self.open),
                "lock" => Some(&mut self.lock),
                "heading" => Some(&mut self.heading),
                "range" => Some(&mut self.range),
                _ => None,
            }
        }
    }

    #[derive(Debug, Default)]
    struct Unbound {
        _value: MetricValue,
    }

    impl StatusBundle for Unbound {
        const NAME: &'static str = "unbound";
        const CONTAINER: &'static str = "unbound";
        const FIELDS: &'static [FieldBinding] = &[FieldBinding {
            api_field: "missing",
            kind: ValueKind::Int,
        }];

        fn slot_mut(&mut self, _api_field: &str) -> Option<&mut MetricValue> {
            None
        }
    }

    const FULL: &str = r#"[
        {"open": {"value": "true", "timestamp": 1700000000000}},
        {"lock": {"value": "2", "timestamp": 1700000001000}},
        {"heading": {"value": "123.4", "timestamp": 1700000002000}},
        {"range": {"value": "420", "timestamp": 1700000003123}}
    ]"#;

    fn ts(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_decode_all_kinds() {
        let sample: Sample = decode(FULL.as_bytes()).unwrap();

        assert_eq!(sample.open.as_bool(), Some(true));
        assert_eq!(sample.open.observed_at(), Some(ts(1_700_000_000_000)));

        assert_eq!(sample.lock.enum_index(), Some(2));
        assert_eq!(sample.lock.label(), "external locked");

        assert_eq!(sample.heading.as_float(), Some(123.4));
        assert_eq!(sample.range.as_int(), Some(420));
        assert_eq!(
            sample.range.observed_at().unwrap().timestamp_nanos_opt(),
            Some(1_700_000_003_123_000_000)
        );
    }

    #[test]
    fn test_absent_fields_are_invalid() {
        let sample: Sample =
            decode(br#"[{"range": {"value": "7", "timestamp": 1700000000000}}]"#).unwrap();

        assert!(sample.range.is_valid());
        assert!(!sample.open.is_valid());
        assert!(!sample.lock.is_valid());
        assert_eq!(sample.lock.label(), "unlocked");
        assert!(!sample.heading.is_valid());
    }

    #[test]
    fn test_empty_response() {
        let sample: Sample = decode(b"[]").unwrap();
        assert_eq!(sample.open, MetricValue::unset(ValueKind::Bool));
        assert_eq!(sample.heading, MetricValue::unset(ValueKind::Float));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let first: Sample = decode(FULL.as_bytes()).unwrap();
        let second: Sample = decode(FULL.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_first_match_wins_and_null_is_skipped() {
        let body = br#"[
            {"range": null},
            {"range": {"value": "1", "timestamp": 1000}},
            {"range": {"value": "2", "timestamp": 2000}}
        ]"#;
        let sample: Sample = decode(body).unwrap();
        assert_eq!(sample.range.as_int(), Some(1));
    }

    #[test]
    fn test_malformed_value_aborts_bundle() {
        let cases = [
            r#"[{"open": {"value": "maybe", "timestamp": 1}}]"#,
            r#"[{"lock": {"value": "two", "timestamp": 1}}]"#,
            r#"[{"heading": {"value": "north", "timestamp": 1}}]"#,
            r#"[{"range": {"value": "4.5", "timestamp": 1}}]"#,
        ];

        for body in cases {
            let result = decode::<Sample>(body.as_bytes());
            assert!(
                matches!(result, Err(DecodeError::InvalidValue { .. })),
                "expected InvalidValue for {}",
                body
            );
        }
    }

    #[test]
    fn test_error_names_field() {
        let body = r#"[
            {"range": {"value": "420", "timestamp": 1}},
            {"open": {"value": "yes", "timestamp": 1}}
        ]"#;
        let err = decode::<Sample>(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("open"));
    }

    #[test]
    fn test_bad_payload_shape() {
        assert!(matches!(
            decode::<Sample>(br#"{"range": "1"}"#),
            Err(DecodeError::Payload(_))
        ));
        assert!(matches!(
            decode::<Sample>(br#"[{"range": {"value": 1, "timestamp": 1}}]"#),
            Err(DecodeError::Payload(_))
        ));
    }

    #[test]
    fn test_timestamp_out_of_range() {
        let body = format!(r#"[{{"range": {{"value": "1", "timestamp": {}}}}}]"#, i64::MAX);
        assert!(matches!(
            decode::<Sample>(body.as_bytes()),
            Err(DecodeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_unbound_field_is_decode_error() {
        assert!(matches!(
            decode::<Unbound>(b"[]"),
            Err(DecodeError::UnboundField { .. })
        ));
    }

    #[test]
    fn test_bool_literals() {
        for t in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(t), Some(true));
        }
        for f in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(f), Some(false));
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }
}
