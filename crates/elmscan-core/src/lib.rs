//! elmscan-core - Core types and collaborator traits for elmscan
//!
//! This crate holds the data model shared by the OBD-II scanner and the UDS
//! client, plus the interfaces of the collaborators the protocol core only
//! consumes:
//!
//! - [`DtcDescriptions`] - `code -> description` lookup, implemented by
//!   [`DtcDatabase`] over `code,description` files
//! - [`KLineDetector`] - legacy K-Line session autodetection

pub mod dtc_db;
pub mod error;
pub mod kline;
pub mod models;

pub use dtc_db::{DtcDatabase, DtcDescriptions, DtcInfo, UNKNOWN_CODE_DESCRIPTION};
pub use error::{DetectError, DtcDbError};
pub use kline::{KLineDetector, KLineProfile, KLineSession};
pub use models::*;
