//! Data model for scanner results

mod fault;
mod freeze_frame;
mod readiness;
mod reading;
mod vehicle;

pub use fault::{DiagnosticCode, DtcStatusKind};
pub use freeze_frame::{FreezeFrameData, UNKNOWN_FREEZE_FRAME_DTC};
pub use readiness::ReadinessStatus;
pub use reading::SensorReading;
pub use vehicle::VehicleInfo;

use chrono::{DateTime, Local, Utc};

/// Format a timestamp the way every report shows it (local time)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
