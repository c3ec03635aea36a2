//! elmscan-uds - UDS over an ELM327 adapter
//!
//! [`UdsTransport`] points the adapter at one ECU (`ATSH` / `ATCRA`) and
//! exchanges raw request/response bytes. [`UdsClient`] builds service frames
//! on top of it, checks for negative responses and decodes DIDs through the
//! tags found in a [`CatalogSet`].
//!
//! ```ignore
//! let catalogs = CatalogSet::new();
//! let mut uds = UdsClient::from_module(&mut elm, &catalogs, "jeep", "generic_engine", UdsClientConfig::default())?;
//! let vin = uds.read_vin("jeep")?;
//! let raw = uds.send_raw(0x22, &[0xF1, 0x90], false)?;
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod nrc;
pub mod service;
pub mod transport;

pub use catalog::{
    normalize_brand, BrandCatalog, CatalogSet, DidEntry, ModuleEntry, RoutineEntry,
    GENERIC_BRAND, STANDARD_DID_KEYS,
};
pub use client::{DidReading, RoutineResult, UdsClient};
pub use config::UdsClientConfig;
pub use decoder::{DidDecoder, DidValue};
pub use error::{parse_did, parse_hex_bytes, Result, UdsError};
pub use nrc::NegativeResponseCode;
pub use transport::UdsTransport;
