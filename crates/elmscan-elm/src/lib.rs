//! elmscan-elm - ELM327 adapter channel
//!
//! Layers, bottom up:
//!
//! - [`link`] - byte-level serial link ([`SerialPortLink`] for hardware,
//!   [`MockLink`] for tests)
//! - [`Elm327`] - command/response framing over the link: buffers cleared
//!   before each write, reads end on the `>` prompt or on bus silence
//! - [`normalize`] - pure functions turning response lines into per-ECU
//!   payload bytes
//!
//! # Example
//!
//! ```ignore
//! use elmscan_elm::{Elm327, ElmConfig, SerialPortLink};
//!
//! let config = ElmConfig { port: Some("/dev/ttyUSB0".into()), ..Default::default() };
//! let link = SerialPortLink::new("/dev/ttyUSB0", config.baudrate, config.timeout());
//! let mut elm = Elm327::new(Box::new(link), config);
//! elm.connect()?;
//! let lines = elm.send_obd_lines("010C")?;
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod kline;
pub mod link;
pub mod normalize;
pub mod ports;
pub mod protocol;
pub mod rawlog;

pub use channel::{Elm327, ObdReply};
pub use config::ElmConfig;
pub use error::{ChannelError, Result};
pub use kline::ElmKLineDetector;
pub use link::{MockLink, SerialLink, SerialPortLink};
pub use normalize::{EcuPayloads, PayloadMatch};
pub use ports::find_ports;
pub use rawlog::{Direction, FileRawLog, RawLog};
