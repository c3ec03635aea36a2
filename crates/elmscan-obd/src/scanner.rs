//! Scanner orchestrator
//!
//! Sequences OBD-II requests over the adapter channel, runs the replies
//! through the normalizer and codecs and keeps the connection state:
//!
//! ```text
//! Disconnected --connect()--> Connecting --0100 answered--> Connected
//!      ^                                                        |
//!      +----------- disconnect() / adapter unplugged -----------+
//! ```
//!
//! Any disconnection seen by a data operation flips the state back to
//! Disconnected before [`ScanError::ConnectionLost`] is returned.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use elmscan_core::{
    DiagnosticCode, DtcDescriptions, DtcStatusKind, FreezeFrameData, ReadinessStatus,
    SensorReading, VehicleInfo, UNKNOWN_FREEZE_FRAME_DTC,
};
use elmscan_elm::normalize::ascii_printable;
use elmscan_elm::{ChannelError, EcuPayloads, Elm327, ObdReply, PayloadMatch};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{dtc, pid, readiness};
use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of [`Scanner::self_test`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfTestReport {
    pub adapter_connected: bool,
    /// Classified reply to `0100`
    pub response: String,
    pub vehicle_ok: bool,
}

const DTC_MODES: [(&str, DtcStatusKind, u8); 3] = [
    ("03", DtcStatusKind::Stored, 0x43),
    ("07", DtcStatusKind::Pending, 0x47),
    ("0A", DtcStatusKind::Permanent, 0x4A),
];

/// OBD-II scanner over one adapter channel
pub struct Scanner {
    elm: Elm327,
    descriptions: Box<dyn DtcDescriptions>,
    state: ConnectionState,
    prefer_ecus: Vec<String>,
}

impl Scanner {
    pub fn new(elm: Elm327, descriptions: Box<dyn DtcDescriptions>) -> Self {
        Self {
            elm,
            descriptions,
            state: ConnectionState::Disconnected,
            prefer_ecus: Vec::new(),
        }
    }

    /// ECUs searched first when several answer (e.g. `["7E8"]`)
    pub fn with_prefer_ecus(mut self, ecus: Vec<String>) -> Self {
        self.prefer_ecus = ecus;
        self
    }

    pub fn set_descriptions(&mut self, descriptions: Box<dyn DtcDescriptions>) {
        self.descriptions = descriptions;
    }

    pub fn describe(&self, code: &str) -> String {
        self.descriptions.get_description(code)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.elm.is_connected()
    }

    pub fn elm(&self) -> &Elm327 {
        &self.elm
    }

    pub fn elm_mut(&mut self) -> &mut Elm327 {
        &mut self.elm
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Open the adapter, negotiate a protocol and check the vehicle answers
    pub fn connect(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;

        if let Err(e) = self.elm.connect() {
            self.state = ConnectionState::Disconnected;
            return Err(ScanError::ConnectFailed(e.to_string()));
        }

        if let Err(e) = self.elm.negotiate_protocol() {
            debug!(error = %e, "Continuing without negotiated protocol");
        }

        match self.elm.test_vehicle_connection() {
            Ok(true) => {
                self.state = ConnectionState::Connected;
                info!(port = ?self.elm.port(), "Vehicle connected");
                Ok(())
            }
            Ok(false) => {
                self.disconnect();
                Err(ScanError::NoResponse)
            }
            Err(e) => {
                self.disconnect();
                Err(e.into())
            }
        }
    }

    /// Try `ports` in order; returns the first one that connects
    pub fn auto_connect(&mut self, ports: &[String]) -> Result<String> {
        if ports.is_empty() {
            return Err(ScanError::ConnectFailed(
                "No USB serial ports found. Is the ELM327 plugged in?".into(),
            ));
        }

        let mut last_error = None;
        for port in ports {
            self.elm.set_port(port);
            match self.connect() {
                Ok(()) => return Ok(port.clone()),
                Err(e) => {
                    debug!(port = %port, error = %e, "Port did not connect");
                    last_error = Some(e);
                    self.disconnect();
                }
            }
        }

        Err(ScanError::ConnectFailed(format!(
            "No responding OBD device found. Tried: {}. Last error: {}",
            ports.join(", "),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.elm.close();
    }

    fn check_connected(&mut self) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ScanError::NotConnected);
        }
        if !self.elm.is_connected() {
            warn!("Adapter channel closed, connection lost");
            self.state = ConnectionState::Disconnected;
            return Err(ScanError::ConnectionLost("Device disconnected".into()));
        }
        Ok(())
    }

    fn channel_failure(&mut self, err: ChannelError) -> ScanError {
        if err.is_disconnected() {
            warn!(error = %err, "Connection lost");
            self.state = ConnectionState::Disconnected;
        }
        err.into()
    }

    fn query_lines(&mut self, command: &str) -> Result<Vec<String>> {
        self.check_connected()?;
        match self.elm.send_obd_lines(command) {
            Ok(lines) => Ok(lines),
            Err(e) => Err(self.channel_failure(e)),
        }
    }

    fn prefer(&self) -> Vec<&str> {
        self.prefer_ecus.iter().map(String::as_str).collect()
    }

    /// Send `command` and locate `expected` in the normalized reply
    pub fn query_payload(&mut self, command: &str, expected: &[u8]) -> Result<Option<PayloadMatch>> {
        let lines = self.query_lines(command)?;
        let payloads = EcuPayloads::from_lines(&lines, self.elm.headers_on());
        Ok(payloads.find_prefix(expected, &self.prefer()))
    }

    /// Like [`query_payload`](Self::query_payload) for ISO-TP framed replies
    pub fn query_payload_isotp(
        &mut self,
        command: &str,
        expected: &[u8],
    ) -> Result<Option<PayloadMatch>> {
        let lines = self.query_lines(command)?;
        let payloads = EcuPayloads::from_lines_isotp(&lines, self.elm.headers_on());
        Ok(payloads.find_prefix(expected, &self.prefer()))
    }

    /// Send an OBD request and classify the reply
    pub fn send_obd(&mut self, command: &str) -> Result<ObdReply> {
        self.check_connected()?;
        match self.elm.send_obd(command) {
            Ok(reply) => Ok(reply),
            Err(e) => Err(self.channel_failure(e)),
        }
    }

    // =========================================================================
    // DTCs
    // =========================================================================

    /// Read stored, pending and permanent codes, deduplicated by code
    pub fn read_dtcs(&mut self) -> Result<Vec<DiagnosticCode>> {
        self.check_connected()?;

        let read_time = Utc::now();
        let mut seen = HashSet::new();
        let mut codes = Vec::new();

        for (mode, status, echo) in DTC_MODES {
            let Some(found) = self.query_payload(mode, &[echo])? else {
                continue;
            };
            let hex_payload = hex::encode_upper(&found.payload);
            for code in dtc::parse(&hex_payload, mode) {
                if !seen.insert(code.clone()) {
                    continue;
                }
                codes.push(DiagnosticCode {
                    description: self.descriptions.get_description(&code),
                    code,
                    status,
                    timestamp: read_time,
                });
            }
        }

        debug!(count = codes.len(), "DTCs read");
        Ok(codes)
    }

    /// Clear codes (Mode 04); true when the ECU acknowledged with `44`
    pub fn clear_dtcs(&mut self) -> Result<bool> {
        let reply = self.send_obd("04")?;
        let cleared = reply.data().is_some_and(|hex| hex.contains("44"));
        info!(cleared, "Clear DTCs");
        Ok(cleared)
    }

    // =========================================================================
    // Live data
    // =========================================================================

    /// Read one Mode 01 PID; `None` if unknown, unsupported or undecodable
    pub fn read_pid(&mut self, pid_code: &str) -> Result<Option<SensorReading>> {
        self.check_connected()?;

        let Some(info) = pid::get_pid_info(pid_code) else {
            return Ok(None);
        };

        let command = format!("01{}", info.code());
        let Some(found) = self.query_payload(&command, &[0x41, info.pid])? else {
            return Ok(None);
        };

        let data = &found.payload[2..];
        let Some(value) = info.decode(data) else {
            return Ok(None);
        };

        Ok(Some(SensorReading::new(
            info.name,
            value,
            info.unit,
            info.code(),
            &data[..info.bytes],
        )))
    }

    /// Read several PIDs; PIDs that fail softly are skipped
    pub fn read_live_data(&mut self, pids: &[&str]) -> Result<Vec<SensorReading>> {
        let mut readings = Vec::with_capacity(pids.len());
        for pid_code in pids {
            match self.read_pid(pid_code) {
                Ok(Some(reading)) => readings.push(reading),
                Ok(None) => {}
                Err(e @ (ScanError::ConnectionLost(_) | ScanError::NotConnected)) => return Err(e),
                Err(e) => debug!(pid = %pid_code, error = %e, "Skipping PID"),
            }
        }
        Ok(readings)
    }

    // =========================================================================
    // Freeze frame (Mode 02)
    // =========================================================================

    /// Read the freeze frame PIDs for `frame`; `None` when nothing decoded
    pub fn read_freeze_frame(&mut self, frame: u8) -> Result<Option<FreezeFrameData>> {
        self.check_connected()?;

        let dtc_code = self.freeze_frame_dtc(frame)?;

        let mut readings = BTreeMap::new();
        for pid_code in pid::FREEZE_FRAME_PIDS {
            let Some(info) = pid::get_pid_info(pid_code) else {
                continue;
            };
            let command = format!("02{}{:02X}", info.code(), frame);
            let Some(found) = self.query_payload(&command, &[0x42, info.pid])? else {
                continue;
            };
            // 42 <pid> <frame> <data..>
            let Some(data) = found.payload.get(3..) else {
                continue;
            };
            if let Some(value) = info.decode(data) {
                readings.insert(
                    info.code(),
                    SensorReading::new(info.name, value, info.unit, info.code(), &data[..info.bytes]),
                );
            }
        }

        if readings.is_empty() {
            return Ok(None);
        }

        Ok(Some(FreezeFrameData {
            dtc_code,
            readings,
            timestamp: Utc::now(),
        }))
    }

    fn freeze_frame_dtc(&mut self, frame: u8) -> Result<String> {
        let found = self.query_payload(&format!("0202{:02X}", frame), &[0x42, 0x02])?;
        let code = found
            .and_then(|m| match m.payload.get(3..5) {
                Some([high, low]) if (*high, *low) != (0, 0) => Some(dtc::decode_bytes(*high, *low)),
                _ => None,
            })
            .filter(|code| dtc::is_valid_code(code))
            .unwrap_or_else(|| UNKNOWN_FREEZE_FRAME_DTC.to_string());
        Ok(code)
    }

    // =========================================================================
    // Readiness / MIL
    // =========================================================================

    /// Monitor status from Mode 01 PID 01, MIL first
    pub fn read_readiness(&mut self) -> Result<Vec<ReadinessStatus>> {
        Ok(self
            .query_payload("0101", &[0x41, 0x01])?
            .map(|m| readiness::decode_payload(&m.payload))
            .unwrap_or_default())
    }

    /// `(mil_on, dtc_count)`; `(false, 0)` when the vehicle does not say
    pub fn get_mil_status(&mut self) -> Result<(bool, u8)> {
        let status = self
            .query_payload("0101", &[0x41, 0x01])?
            .and_then(|m| m.payload.get(2).copied())
            .map(|a| (a & 0x80 != 0, a & 0x7F))
            .unwrap_or((false, 0));
        Ok(status)
    }

    // =========================================================================
    // Vehicle info / self test
    // =========================================================================

    /// Protocol, adapter version, VIN and MIL summary
    ///
    /// VIN and MIL are best-effort; only a lost connection aborts.
    pub fn get_vehicle_info(&mut self) -> Result<VehicleInfo> {
        self.check_connected()?;

        let mut info = VehicleInfo {
            protocol: self.elm.get_protocol(),
            elm_version: self.elm.elm_version().unwrap_or("unknown").to_string(),
            ..Default::default()
        };

        match self.query_payload_isotp("0902", &[0x49, 0x02]) {
            Ok(Some(found)) => {
                let vin = found.payload.get(3..).map(ascii_printable).unwrap_or_default();
                if !vin.is_empty() {
                    info.vin = Some(vin);
                }
                info.vin_raw = Some(hex::encode_upper(&found.payload));
            }
            Ok(None) => debug!("Vehicle did not report a VIN"),
            Err(e @ (ScanError::ConnectionLost(_) | ScanError::NotConnected)) => return Err(e),
            Err(e) => warn!(error = %e, "VIN read failed"),
        }

        match self.get_mil_status() {
            Ok((mil_on, count)) => {
                info.mil_on = mil_on;
                info.dtc_count = count;
            }
            Err(e @ (ScanError::ConnectionLost(_) | ScanError::NotConnected)) => return Err(e),
            Err(e) => warn!(error = %e, "MIL status read failed"),
        }

        Ok(info)
    }

    /// Adapter presence and `0100` canary
    pub fn self_test(&mut self) -> SelfTestReport {
        let adapter_connected = self.elm.is_connected();
        let (response, vehicle_ok) = match self.elm.send_obd("0100") {
            Ok(reply) => {
                let ok = reply.data().is_some_and(|hex| hex.contains("4100"));
                (reply.to_string(), ok)
            }
            Err(e) => {
                let e = self.channel_failure(e);
                debug!(error = %e, "Self test exchange failed");
                ("DISCONNECTED".to_string(), false)
            }
        };
        SelfTestReport {
            adapter_connected,
            response,
            vehicle_ok,
        }
    }
}
