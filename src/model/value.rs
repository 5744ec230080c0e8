//! Sample primitives shared by every result shape.
//!
//! Values travel on the wire as strings (`"1.5"`, `"NaN"`, `"+Inf"`) paired
//! with a numeric timestamp in seconds, exactly as the upstream API emits
//! them. Nothing here converts units or timezones.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Label set attached to a vector sample or matrix series.
///
/// Ordered so re-encoding is deterministic.
pub type Labels = BTreeMap<String, String>;

/// A sample value as carried by the upstream wire format.
///
/// Non-finite values (`NaN`, `+Inf`, `-Inf`) are legal and must survive a
/// decode/encode round trip. Equality treats two NaNs as equal so decoded
/// payloads containing NaN remain comparable.
#[derive(Debug, Clone, Copy)]
pub struct SampleValue(pub f64);

impl SampleValue {
    pub fn as_f64(self) -> f64 {
        self.0
    }

    fn parse(s: &str) -> Option<f64> {
        match s {
            "NaN" => Some(f64::NAN),
            "Inf" | "+Inf" => Some(f64::INFINITY),
            "-Inf" => Some(f64::NEG_INFINITY),
            _ => s.parse::<f64>().ok(),
        }
    }
}

impl PartialEq for SampleValue {
    fn eq(&self, other: &Self) -> bool {
        (self.0.is_nan() && other.0.is_nan()) || self.0 == other.0
    }
}

impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        SampleValue(v)
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            f.write_str("NaN")
        } else if self.0 == f64::INFINITY {
            f.write_str("+Inf")
        } else if self.0 == f64::NEG_INFINITY {
            f.write_str("-Inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for SampleValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SampleValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .map(SampleValue)
            .ok_or_else(|| de::Error::custom(format!("invalid sample value {s:?}")))
    }
}

/// A single `(timestamp, value)` pair, wire form `[<seconds>, "<value>"]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePair {
    /// Epoch seconds, fractional part preserved as received.
    pub timestamp: f64,
    pub value: SampleValue,
}

impl SamplePair {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self {
            timestamp,
            value: SampleValue(value),
        }
    }
}

impl Serialize for SamplePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.timestamp)?;
        tup.serialize_element(&self.value)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for SamplePair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (timestamp, value) = <(f64, SampleValue)>::deserialize(deserializer)?;
        Ok(SamplePair { timestamp, value })
    }
}

/// A single `(timestamp, string)` pair, wire form `[<seconds>, "<text>"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StringSample {
    pub timestamp: f64,
    pub value: String,
}

impl Serialize for StringSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.timestamp)?;
        tup.serialize_element(&self.value)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for StringSample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (timestamp, value) = <(f64, String)>::deserialize(deserializer)?;
        Ok(StringSample { timestamp, value })
    }
}
