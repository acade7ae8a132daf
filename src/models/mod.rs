//! Data models shared by the device layer, the poll loops and the HTTP API

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UnsupportedPropertyType;

/// Properties exported as gauges, one family per entry
pub const PROPERTIES: [&str; 22] = [
    "power",
    "mode",
    "target_temperature",
    "temperature_units",
    "current_temperature",
    "fan_speed",
    "fresh_air",
    "xfan",
    "anion",
    "sleep",
    "light",
    "horizontal_swing",
    "vertical_swing",
    "quiet",
    "turbo",
    "steady_heat",
    "power_save",
    "target_humidity",
    "dehumidifier_mode",
    "current_humidity",
    "clean_filter",
    "water_full",
];

// ============================================================================
// Device descriptor
// ============================================================================

/// Network identity of a unit found by a scan, before binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Hardware address, used as registry key and metric label
    pub mac: String,
    pub ip: IpAddr,
    #[serde(default = "default_device_port")]
    pub port: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

fn default_device_port() -> u16 {
    7000
}

impl DeviceInfo {
    pub fn new(mac: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            mac: mac.into(),
            ip,
            port: default_device_port(),
            name: None,
            brand: None,
            model: None,
            version: None,
        }
    }
}

// ============================================================================
// Device state
// ============================================================================

/// Property bag reported by one refresh of a unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(HashMap<String, Value>);

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric reading for a property, `None` when missing or not numeric
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|value| gauge_value(value).ok())
    }
}

impl FromIterator<(String, Value)> for DeviceState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert a reported value into a gauge reading.
///
/// Numbers pass through and booleans map to 1/0. Everything else has no
/// gauge representation.
pub fn gauge_value(value: &Value) -> Result<f64, UnsupportedPropertyType> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or(UnsupportedPropertyType { kind: "number" }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Err(UnsupportedPropertyType { kind: "null" }),
        Value::String(_) => Err(UnsupportedPropertyType { kind: "string" }),
        Value::Array(_) => Err(UnsupportedPropertyType { kind: "array" }),
        Value::Object(_) => Err(UnsupportedPropertyType { kind: "object" }),
    }
}

// ============================================================================
// Status views
// ============================================================================

/// Snapshot of a bound session, served by `/api/devices`
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub bound_at: DateTime<Utc>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub state: DeviceState,
}
