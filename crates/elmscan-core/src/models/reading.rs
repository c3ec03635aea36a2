//! Live data readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded PID value
///
/// Produced by the PID codec; never mutated afterwards. `raw_hex` holds the
/// bytes the formula consumed, two uppercase hex digits per byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Human-readable PID name (e.g. "Engine RPM")
    pub name: String,
    /// Physical value, rounded to 2 decimals
    pub value: f64,
    /// Unit of `value`
    pub unit: String,
    /// PID as two uppercase hex digits (e.g. "0C")
    pub pid: String,
    /// Raw data bytes as hex
    pub raw_hex: String,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        pid: impl Into<String>,
        raw: &[u8],
    ) -> Self {
        Self {
            name: name.into(),
            value: round2(value),
            unit: unit.into(),
            pid: pid.into(),
            raw_hex: raw.iter().map(|b| format!("{:02X}", b)).collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn timestamp_str(&self) -> String {
        super::format_timestamp(&self.timestamp)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
