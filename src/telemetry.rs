//! Telemetry readings and their JSON encoding.
//!
//! A [`Reading`] is an ordered set of named measurements taken from the sensor
//! in one snapshot. It serializes to a flat JSON object in insertion order, and
//! every value keeps its numeric kind: integers stay integers and floats stay
//! floats, nothing is turned into a string.
//!
//! ```rust
//! use telenode::telemetry::Reading;
//!
//! let mut reading = Reading::new();
//! reading.insert("Temperatur", 21.5f32).unwrap();
//! reading.insert("Luftfeuchte", 40).unwrap();
//!
//! let json = reading.to_json().unwrap();
//! assert_eq!(json.as_str(), r#"{"Temperatur":21.5,"Luftfeuchte":40}"#);
//! ```

use heapless::{String, Vec};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Maximum number of metrics in one reading.
pub const MAX_METRICS: usize = 8;
/// Maximum metric name length in bytes.
pub const MAX_NAME_LEN: usize = 32;
/// Capacity of the serialized JSON body.
pub const MAX_BODY_LEN: usize = 512;

/// A single measurement value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Whole-number measurement, e.g. a percentage reported as an integer.
    Integer(i64),
    /// Fractional measurement at sensor precision.
    Float(f32),
    /// Fractional measurement kept at full precision, e.g. a coordinate.
    Double(f64),
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Integer(i64::from(value))
                }
            }
        )*
    };
}

integer_from!(i8, u8, i16, u16, i32, u32, i64);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Integer(v) => serializer.serialize_i64(v),
            Value::Float(v) => serializer.serialize_f32(v),
            Value::Double(v) => serializer.serialize_f64(v),
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
        }
    }
}

/// Errors building or encoding a [`Reading`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The reading already holds [`MAX_METRICS`] entries.
    Full,
    /// A metric name exceeds [`MAX_NAME_LEN`].
    NameTooLong,
    /// The JSON encoding does not fit in [`MAX_BODY_LEN`] bytes.
    BodyTooLarge,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Full => f.write_str("too many metrics"),
            Error::NameTooLong => f.write_str("metric name too long"),
            Error::BodyTooLarge => f.write_str("encoded reading too large"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Full => defmt::write!(f, "Full"),
            Error::NameTooLong => defmt::write!(f, "NameTooLong"),
            Error::BodyTooLarge => defmt::write!(f, "BodyTooLarge"),
        }
    }
}

/// Ordered mapping from metric name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    metrics: Vec<(String<MAX_NAME_LEN>, Value), MAX_METRICS>,
}

impl Reading {
    /// Create an empty reading.
    pub fn new() -> Self {
        Self {
            metrics: Vec::new(),
        }
    }

    /// Set `name` to `value`.
    ///
    /// A name that is already present keeps its position and gets the new value.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        if let Some(slot) = self.metrics.iter_mut().find(|(n, _)| n.as_str() == name) {
            slot.1 = value;
            return Ok(());
        }
        let name = String::try_from(name).map_err(|_| Error::NameTooLong)?;
        self.metrics.push((name, value)).map_err(|_| Error::Full)
    }

    /// Look up a metric by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.metrics
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| *v)
    }

    /// Iterate metrics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.metrics.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// `true` when no metric has been recorded.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Encode as a compact JSON object.
    pub fn to_json(&self) -> Result<String<MAX_BODY_LEN>, Error> {
        let mut buf = [0u8; MAX_BODY_LEN];
        let len = serde_json_core::to_slice(self, &mut buf).map_err(|_| Error::BodyTooLarge)?;
        let json = core::str::from_utf8(&buf[..len]).map_err(|_| Error::BodyTooLarge)?;
        String::try_from(json).map_err(|_| Error::BodyTooLarge)
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len()))?;
        for (name, value) in &self.metrics {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}
