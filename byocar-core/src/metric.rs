//! Typed, timestamped metric values.
//!
//! Every field of a status bundle is a [`MetricValue`]: one of four value
//! kinds plus the vendor-side observation time. A value without an
//! observation time is *invalid*: the vehicle did not report the field.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Label rendered for enum indices outside the label set.
pub const UNKNOWN_LABEL: &str = "n/a";

/// The declared kind of a vendor field.
///
/// Enum kinds carry the ordered label set used to render indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Enum(&'static [&'static str]),
    Float,
    Int,
}

impl ValueKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Enum(_) => "enum",
            ValueKind::Float => "float",
            ValueKind::Int => "int",
        }
    }
}

/// A decoded scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Enum {
        index: i64,
        labels: &'static [&'static str],
    },
    Float(f64),
    Int(i64),
}

impl Value {
    /// The zero value of a kind.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Enum(labels) => Value::Enum { index: 0, labels },
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Int => Value::Int(0),
        }
    }

    /// Numeric representation: booleans as 0/1, enums as their index.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Value::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Enum { index, .. } => index as f64,
            Value::Float(f) => f,
            Value::Int(i) => i as f64,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Enum { index, labels } => f.write_str(enum_label(index, labels)),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(i) => write!(f, "{}", i),
        }
    }
}

fn enum_label(index: i64, labels: &'static [&'static str]) -> &'static str {
    usize::try_from(index)
        .ok()
        .and_then(|i| labels.get(i))
        .copied()
        .unwrap_or(UNKNOWN_LABEL)
}

/// A value together with the time the vehicle observed it.
///
/// The default value is an invalid integer zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValue {
    value: Value,
    observed_at: Option<DateTime<Utc>>,
}

impl Default for MetricValue {
    fn default() -> Self {
        Self::unset(ValueKind::Int)
    }
}

impl MetricValue {
    /// A valid value observed at `observed_at`.
    pub fn new(value: Value, observed_at: DateTime<Utc>) -> Self {
        Self {
            value,
            observed_at: Some(observed_at),
        }
    }

    /// The invalid zero value of a kind, for fields absent from a response.
    pub fn unset(kind: ValueKind) -> Self {
        Self {
            value: Value::zero(kind),
            observed_at: None,
        }
    }

    /// Whether the field was present in the response it was decoded from.
    pub fn is_valid(&self) -> bool {
        self.observed_at.is_some()
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn to_f64(&self) -> f64 {
        self.value.to_f64()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Index of an enum value.
    pub fn enum_index(&self) -> Option<i64> {
        match self.value {
            Value::Enum { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Human readable label of an enum value.
    ///
    /// Indices outside the label set, and non-enum values, render as `"n/a"`.
    pub fn label(&self) -> &'static str {
        match self.value {
            Value::Enum { index, labels } => enum_label(index, labels),
            _ => UNKNOWN_LABEL,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.observed_at {
            Some(at) => write!(
                f,
                "{} ({})",
                self.value,
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => write!(f, "{} (unset)", self.value),
        }
    }
}
