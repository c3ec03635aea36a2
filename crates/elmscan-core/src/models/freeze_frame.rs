//! Freeze frame snapshot (Mode 02)

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SensorReading;

/// DTC placeholder used when the ECU does not report the triggering code
pub const UNKNOWN_FREEZE_FRAME_DTC: &str = "Unknown";

/// Sensor values captured when a DTC was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeFrameData {
    /// Code that triggered the frame, or [`UNKNOWN_FREEZE_FRAME_DTC`]
    pub dtc_code: String,
    /// Readings keyed by PID
    pub readings: BTreeMap<String, SensorReading>,
    pub timestamp: DateTime<Utc>,
}

impl FreezeFrameData {
    pub fn has_known_dtc(&self) -> bool {
        self.dtc_code != UNKNOWN_FREEZE_FRAME_DTC
    }
}
