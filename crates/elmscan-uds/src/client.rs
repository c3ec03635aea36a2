//! High level UDS client

use elmscan_elm::Elm327;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{normalize_brand, CatalogSet};
use crate::config::UdsClientConfig;
use crate::decoder::DidValue;
use crate::error::{parse_did, Result, UdsError};
use crate::service::{self, routine_sub_function, service_id};
use crate::transport::UdsTransport;

/// DID read or write outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DidReading {
    /// DID echoed by the ECU, 4 hex digits
    pub did: String,
    /// Data bytes as uppercase hex
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<DidValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutineResult {
    pub routine: String,
    pub routine_id: String,
    /// Routine status record after the echoed `71 <sub> <id>` prefix
    pub status: String,
}

/// UDS client bound to one ECU address
///
/// The adapter is configured for the target before the first request unless
/// auto-configure is off; after that only [`configure`](Self::configure)
/// re-sends the setup.
pub struct UdsClient<'a> {
    transport: UdsTransport<'a>,
    catalogs: &'a CatalogSet,
    auto_configure: bool,
    /// Adapter currently addressed to this target
    configured: bool,
    /// Auto-configure already ran; `release` does not reset it
    auto_configured: bool,
}

impl<'a> UdsClient<'a> {
    pub fn new(elm: &'a mut Elm327, catalogs: &'a CatalogSet, config: UdsClientConfig) -> Self {
        Self {
            transport: UdsTransport::new(elm, &config),
            catalogs,
            auto_configure: config.auto_configure,
            configured: false,
            auto_configured: false,
        }
    }

    /// Client addressed to a catalog module, e.g. `("jeep", "bcm")`
    pub fn from_module(
        elm: &'a mut Elm327,
        catalogs: &'a CatalogSet,
        brand: &str,
        module: &str,
        config: UdsClientConfig,
    ) -> Result<Self> {
        let entry = catalogs
            .find_module(brand, module)
            .ok_or_else(|| UdsError::UnknownModule {
                brand: normalize_brand(brand),
                module: module.to_string(),
            })?;
        debug!(module = %entry.name, tx_id = %entry.tx_id, rx_id = %entry.rx_id, "Resolved UDS module");
        let config = config.with_ids(&entry.tx_id, &entry.rx_id);
        Ok(Self::new(elm, catalogs, config))
    }

    pub fn transport(&self) -> &UdsTransport<'a> {
        &self.transport
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn configure(&mut self) -> Result<()> {
        self.transport.configure()?;
        self.configured = true;
        self.auto_configured = true;
        Ok(())
    }

    /// Restore functional OBD addressing on the adapter
    ///
    /// Later requests are not re-addressed automatically; call
    /// [`configure`](Self::configure) to target the ECU again.
    pub fn release(&mut self) -> Result<()> {
        self.transport.release()?;
        self.configured = false;
        Ok(())
    }

    fn ensure_configured(&mut self) -> Result<()> {
        if self.auto_configure && !self.auto_configured {
            self.configure()?;
        }
        Ok(())
    }

    fn exchange(&mut self, sid: u8, data: &[u8]) -> Result<Vec<u8>> {
        self.ensure_configured()?;
        let request = service::build_request(sid, data);
        let response = self.transport.send(&request)?;
        Ok(service::skip_response_pending(response))
    }

    /// Send a request and require the positive response for `sid`
    pub fn send_and_expect(&mut self, sid: u8, data: &[u8]) -> Result<Vec<u8>> {
        let response = self.exchange(sid, data)?;
        service::check_positive(sid, &response)?;
        Ok(response)
    }

    /// Send any request and return the response bytes as received
    ///
    /// A negative response is returned as data unless `raise_on_negative`
    /// is set, so NRCs stay visible while probing DIDs or routines.
    pub fn send_raw(&mut self, sid: u8, data: &[u8], raise_on_negative: bool) -> Result<Vec<u8>> {
        let response = self.exchange(sid, data)?;
        if response.is_empty() {
            return Err(UdsError::InvalidResponse("Empty UDS response".to_string()));
        }
        if raise_on_negative {
            if let Some(err) = service::negative_error(&response) {
                return Err(err);
            }
        }
        Ok(response)
    }

    pub fn diagnostic_session(&mut self, session_type: u8) -> Result<()> {
        self.send_and_expect(service_id::DIAGNOSTIC_SESSION_CONTROL, &[session_type])?;
        info!(session = session_type, "Diagnostic session entered");
        Ok(())
    }

    pub fn tester_present(&mut self) -> Result<()> {
        self.send_and_expect(service_id::TESTER_PRESENT, &[0x00])?;
        Ok(())
    }

    /// ReadDataByIdentifier (0x22), decoded when the catalog knows the DID
    pub fn read_did(&mut self, brand: &str, did: u16) -> Result<DidReading> {
        let response = self.send_and_expect(service_id::READ_DATA_BY_ID, &did.to_be_bytes())?;
        if response.len() < 3 {
            return Err(UdsError::InvalidResponse(
                "Response too short for DID read".to_string(),
            ));
        }
        let echoed = u16::from_be_bytes([response[1], response[2]]);
        let data = &response[3..];
        let entry = self.catalogs.find_did(brand, did);

        Ok(DidReading {
            did: format!("{:04X}", echoed),
            raw: hex::encode_upper(data),
            name: entry.map(|e| e.name.clone()),
            value: entry.map(|e| e.decoder().decode(data)),
        })
    }

    /// Read a DID by catalog name, `None` when the name is unknown
    pub fn read_did_named(&mut self, brand: &str, name: &str) -> Result<Option<DidReading>> {
        let Some(did) = self
            .catalogs
            .find_did_by_name(brand, name)
            .and_then(|entry| parse_did(&entry.did).ok())
        else {
            return Ok(None);
        };
        self.read_did(brand, did).map(Some)
    }

    /// VIN via DID F190
    pub fn read_vin(&mut self, brand: &str) -> Result<DidReading> {
        self.read_did(brand, 0xF190)
    }

    /// WriteDataByIdentifier (0x2E)
    ///
    /// `brand` is only used to name the DID. The returned `did` is the one
    /// the ECU echoed and `raw` the data written.
    pub fn write_did(&mut self, brand: Option<&str>, did: u16, data: &[u8]) -> Result<DidReading> {
        let mut payload = did.to_be_bytes().to_vec();
        payload.extend_from_slice(data);
        let response = self.send_and_expect(service_id::WRITE_DATA_BY_ID, &payload)?;
        if response.len() < 3 {
            return Err(UdsError::InvalidResponse(
                "Response too short for DID write".to_string(),
            ));
        }
        let echoed = u16::from_be_bytes([response[1], response[2]]);
        info!(did = %format!("{:04X}", echoed), bytes = data.len(), "DID written");

        Ok(DidReading {
            did: format!("{:04X}", echoed),
            raw: hex::encode_upper(data),
            name: brand
                .and_then(|b| self.catalogs.find_did(b, did))
                .map(|e| e.name.clone()),
            value: None,
        })
    }

    /// RoutineControl (0x31) by numeric id, returns the status record
    pub fn routine_control_by_id(
        &mut self,
        routine_id: u16,
        subfunction: u8,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let mut data = vec![subfunction];
        data.extend_from_slice(&routine_id.to_be_bytes());
        data.extend_from_slice(payload);

        let response = self.send_and_expect(service_id::ROUTINE_CONTROL, &data)?;
        if response.len() < 4 {
            return Err(UdsError::InvalidResponse(
                "Routine response too short".to_string(),
            ));
        }
        Ok(response[4..].to_vec())
    }

    /// RoutineControl (0x31) by catalog name
    pub fn routine_control(
        &mut self,
        brand: &str,
        routine: &str,
        subfunction: u8,
        payload: &[u8],
    ) -> Result<RoutineResult> {
        let catalogs = self.catalogs;
        let entry = catalogs
            .find_routine(brand, routine)
            .ok_or_else(|| UdsError::UnknownRoutine(routine.to_string()))?;
        let routine_id = entry.id()?;
        let status = self.routine_control_by_id(routine_id, subfunction, payload)?;

        Ok(RoutineResult {
            routine: routine.to_string(),
            routine_id: entry.routine_id.clone(),
            status: hex::encode_upper(status),
        })
    }

    /// Start a catalog routine without parameters
    pub fn start_routine(&mut self, brand: &str, routine: &str) -> Result<RoutineResult> {
        self.routine_control(brand, routine, routine_sub_function::START_ROUTINE, &[])
    }
}
