//! Command implementations for elmscan

pub mod dtc;
pub mod freeze;
pub mod info;
pub mod kline;
pub mod live;
pub mod lookup;
pub mod ports;
pub mod readiness;
pub mod uds;

pub use dtc::dtc;
pub use freeze::freeze;
pub use info::{info, scan};
pub use kline::kline;
pub use live::{live, LiveOptions};
pub use lookup::{lookup, pids};
pub use ports::ports;
pub use readiness::readiness;
pub use uds::uds;
