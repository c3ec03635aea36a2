//! Diagnostic trouble code results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which OBD-II service reported the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtcStatusKind {
    /// Mode 03 - confirmed, MIL-relevant
    Stored,
    /// Mode 07 - detected this or last drive cycle
    Pending,
    /// Mode 0A - cannot be cleared by a scan tool
    Permanent,
}

impl DtcStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DtcStatusKind::Stored => "stored",
            DtcStatusKind::Pending => "pending",
            DtcStatusKind::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for DtcStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DTC read from the vehicle, with its description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// 5-character code (e.g. "P0118")
    pub code: String,
    pub description: String,
    pub status: DtcStatusKind,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticCode {
    pub fn timestamp_str(&self) -> String {
        super::format_timestamp(&self.timestamp)
    }
}
