//! Metadata values and numeric coercion
//!
//! Metadata travels as loosely typed values: a TTL may arrive as an `i32`
//! from one caller and a `u64` from another, or as a JSON number after a
//! round-trip through the store. `MetaValue` is the closed set of shapes a
//! metadata value can take, and the functions here coerce it into the one
//! numeric type each metadata field needs.
//!
//! ## Rules
//!
//! - Integer sources of any width and signedness are accepted.
//! - Negative values coerce to 0 for unsigned targets.
//! - Values above the target range saturate at the target maximum.
//! - Floats, strings and booleans are rejected (`None`). The only exception
//!   is the CAS path, see [`crate::Cas::coerce`].

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::cas::Cas;
use crate::metadata::ScanConsistency;

/// A single metadata value
///
/// Signed integers of every width are carried as `Int`, unsigned ones as
/// `UInt`, so the coercion functions only have two integer shapes to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Explicit null
    Null,
    /// Boolean flag (ADHOC)
    Bool(bool),
    /// Any signed integer
    Int(i64),
    /// Any unsigned integer
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// Text
    Str(String),
    /// Point in time (CREATEDON / UPDATEDON in memory)
    Time(DateTime<Utc>),
    /// Duration (TIMEOUT)
    Duration(Duration),
    /// Compare-and-swap token
    Cas(Cas),
    /// Scan consistency level (CONSISTENCY)
    Consistency(ScanConsistency),
    /// Arbitrary JSON (extension keys, decoded metadata)
    Json(JsonValue),
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for MetaValue {
            fn from(v: $t) -> Self {
                MetaValue::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for MetaValue {
            fn from(v: $t) -> Self {
                MetaValue::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<f32> for MetaValue {
    fn from(v: f32) -> Self {
        MetaValue::Float(v as f64)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(v: DateTime<Utc>) -> Self {
        MetaValue::Time(v)
    }
}

impl From<Duration> for MetaValue {
    fn from(v: Duration) -> Self {
        MetaValue::Duration(v)
    }
}

impl From<Cas> for MetaValue {
    fn from(v: Cas) -> Self {
        MetaValue::Cas(v)
    }
}

impl From<ScanConsistency> for MetaValue {
    fn from(v: ScanConsistency) -> Self {
        MetaValue::Consistency(v)
    }
}

impl From<JsonValue> for MetaValue {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => MetaValue::Null,
            JsonValue::Bool(b) => MetaValue::Bool(b),
            JsonValue::String(s) => MetaValue::Str(s),
            JsonValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    MetaValue::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    MetaValue::Int(i)
                } else {
                    MetaValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            other => MetaValue::Json(other),
        }
    }
}

impl MetaValue {
    /// Convert to a JSON value for persistence or the extension map
    ///
    /// Times become nanoseconds since epoch, durations become milliseconds.
    pub fn to_json(&self) -> JsonValue {
        match self {
            MetaValue::Null => JsonValue::Null,
            MetaValue::Bool(b) => JsonValue::Bool(*b),
            MetaValue::Int(i) => JsonValue::from(*i),
            MetaValue::UInt(u) => JsonValue::from(*u),
            MetaValue::Float(f) => JsonValue::from(*f),
            MetaValue::Str(s) => JsonValue::String(s.clone()),
            MetaValue::Time(t) => match t.timestamp_nanos_opt() {
                Some(nanos) => JsonValue::from(nanos),
                None => JsonValue::Null,
            },
            MetaValue::Duration(d) => JsonValue::from(d.as_millis() as u64),
            MetaValue::Cas(c) => JsonValue::from(c.as_u64()),
            MetaValue::Consistency(c) => JsonValue::from(c.code()),
            MetaValue::Json(v) => v.clone(),
        }
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Coerce a metadata value into `u32` seconds (TTL, LOCK)
///
/// Returns `None` when the value is not an integer.
pub fn to_u32(value: &MetaValue) -> Option<u32> {
    match value {
        MetaValue::Int(i) => Some((*i).clamp(0, u32::MAX as i64) as u32),
        MetaValue::UInt(u) => Some((*u).min(u32::MAX as u64) as u32),
        MetaValue::Json(JsonValue::Number(n)) => {
            if let Some(u) = n.as_u64() {
                Some(u.min(u32::MAX as u64) as u32)
            } else {
                n.as_i64().map(|i| i.clamp(0, u32::MAX as i64) as u32)
            }
        }
        _ => None,
    }
}

/// Coerce a metadata value into `i64` (nanosecond timestamps)
///
/// Returns `None` when the value is not an integer.
pub fn to_i64(value: &MetaValue) -> Option<i64> {
    match value {
        MetaValue::Int(i) => Some(*i),
        MetaValue::UInt(u) => Some((*u).min(i64::MAX as u64) as i64),
        MetaValue::Json(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u.min(i64::MAX as u64) as i64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_u32_accepts_every_integer_width() {
        assert_eq!(to_u32(&MetaValue::from(5i8)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5i16)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5i32)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5i64)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5u8)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5u16)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5u32)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5u64)), Some(5));
        assert_eq!(to_u32(&MetaValue::from(5usize)), Some(5));
    }

    #[test]
    fn test_to_u32_saturates() {
        assert_eq!(to_u32(&MetaValue::from(-1i32)), Some(0));
        assert_eq!(to_u32(&MetaValue::from(u64::MAX)), Some(u32::MAX));
        assert_eq!(to_u32(&MetaValue::from(i64::MAX)), Some(u32::MAX));
    }

    #[test]
    fn test_to_u32_rejects_non_integers() {
        assert_eq!(to_u32(&MetaValue::from(1.5f64)), None);
        assert_eq!(to_u32(&MetaValue::from("5")), None);
        assert_eq!(to_u32(&MetaValue::from(true)), None);
        assert_eq!(to_u32(&MetaValue::Null), None);
    }

    #[test]
    fn test_json_numbers_normalize_to_integers() {
        let v = MetaValue::from(serde_json::json!(42));
        assert_eq!(v, MetaValue::UInt(42));
        let v = MetaValue::from(serde_json::json!(-42));
        assert_eq!(v, MetaValue::Int(-42));
        assert_eq!(to_u32(&MetaValue::Json(serde_json::json!(7))), Some(7));
    }

    #[test]
    fn test_to_i64() {
        assert_eq!(to_i64(&MetaValue::from(-3i8)), Some(-3));
        assert_eq!(to_i64(&MetaValue::from(u64::MAX)), Some(i64::MAX));
        assert_eq!(to_i64(&MetaValue::from("x")), None);
    }

    #[test]
    fn test_time_serializes_as_nanos() {
        let t = DateTime::<Utc>::from_timestamp(1_700_000_000, 123).unwrap();
        let json = MetaValue::Time(t).to_json();
        assert_eq!(json, serde_json::json!(1_700_000_000_000_000_123i64));
    }

    proptest! {
        #[test]
        fn prop_u32_sources_round_trip(v in any::<u32>()) {
            prop_assert_eq!(to_u32(&MetaValue::from(v)), Some(v));
            prop_assert_eq!(to_u32(&MetaValue::from(v as i64)), Some(v));
        }

        #[test]
        fn prop_negative_never_wraps(v in i64::MIN..0i64) {
            prop_assert_eq!(to_u32(&MetaValue::from(v)), Some(0));
        }
    }
}
