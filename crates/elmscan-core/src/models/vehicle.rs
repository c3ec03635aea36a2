//! Connection / vehicle summary

use serde::{Deserialize, Serialize};

/// Summary gathered right after connecting
///
/// Every field is best-effort: a missing VIN or an unreadable MIL status
/// leaves the defaults in place rather than failing the whole query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    /// Protocol name as reported by the adapter
    pub protocol: String,
    /// Adapter firmware banner (e.g. "ELM327 v1.5")
    pub elm_version: String,
    /// VIN, printable ASCII only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    /// Raw Mode 09 PID 02 payload as hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin_raw: Option<String>,
    pub mil_on: bool,
    pub dtc_count: u8,
}
