//! elmscan-obd - OBD-II over an ELM327 channel
//!
//! - [`codec`] - pure decoders: DTCs, Mode 01 PID formulas, readiness bits
//! - [`Scanner`] - stateful facade sequencing OBD requests over the channel
//! - [`LiveMonitor`] / [`SessionLog`] - periodic PID polling with an
//!   optional recording sink

pub mod codec;
pub mod error;
pub mod monitor;
pub mod scanner;
pub mod session_log;

pub use codec::pid::{get_pid_info, list_available_pids, PidInfo, DIAGNOSTIC_PIDS, TEMPERATURE_PIDS, THROTTLE_PIDS};
pub use error::{Result, ScanError};
pub use monitor::{LiveMonitor, MonitorSummary, ReadingSink};
pub use scanner::{ConnectionState, Scanner, SelfTestReport};
pub use session_log::{LogFormat, SessionLog};
