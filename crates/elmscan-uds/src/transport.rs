//! UDS transport over the ELM327
//!
//! The adapter does ISO-TP segmentation itself: a request goes out as hex
//! text after `ATSH`, and the reply frames (filtered to the response id by
//! `ATCRA`) come back as lines which the normalizer reassembles.

use std::time::Duration;

use elmscan_elm::{ChannelError, EcuPayloads, Elm327};
use tracing::{debug, info};

use crate::config::UdsClientConfig;
use crate::error::Result;

const AT_TIMEOUT: Duration = Duration::from_secs(1);

/// Functional OBD request header restored by [`UdsTransport::release`]
const FUNCTIONAL_HEADER: &str = "7DF";

pub struct UdsTransport<'a> {
    elm: &'a mut Elm327,
    tx_id: String,
    rx_id: String,
    protocol: String,
    timeout: Duration,
}

impl<'a> UdsTransport<'a> {
    pub fn new(elm: &'a mut Elm327, config: &UdsClientConfig) -> Self {
        Self {
            elm,
            tx_id: config.tx_id.trim().to_uppercase(),
            rx_id: config.rx_id.trim().to_uppercase(),
            protocol: config.protocol.trim().to_uppercase(),
            timeout: config.timeout(),
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn rx_id(&self) -> &str {
        &self.rx_id
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Select the protocol, turn headers on and address the ECU
    pub fn configure(&mut self) -> Result<()> {
        let commands = [
            format!("ATSP{}", self.protocol),
            "ATH1".to_string(),
            format!("ATSH{}", self.tx_id),
            format!("ATCRA{}", self.rx_id),
        ];
        for command in &commands {
            self.at(command)?;
        }
        info!(
            tx_id = %self.tx_id,
            rx_id = %self.rx_id,
            protocol = %self.protocol,
            "UDS transport configured"
        );
        Ok(())
    }

    /// Undo the addressing so plain OBD requests work again
    pub fn release(&mut self) -> Result<()> {
        let headers = if self.elm.headers_on() { "ATH1" } else { "ATH0" };
        let functional = format!("ATSH{}", FUNCTIONAL_HEADER);
        for command in ["ATCRA", functional.as_str(), headers] {
            self.at(command)?;
        }
        debug!("UDS transport released");
        Ok(())
    }

    fn at(&mut self, command: &str) -> Result<()> {
        let reply = self.elm.send_lines(command, AT_TIMEOUT)?;
        if reply.iter().any(|l| l.contains('?')) {
            return Err(ChannelError::Negotiation(format!("{} rejected by adapter", command)).into());
        }
        Ok(())
    }

    /// One request/response exchange
    ///
    /// Returns the reassembled payload of the response id, or of the first
    /// responder when the filter let nothing from it through. No reply at
    /// all is an empty payload.
    pub fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        let command = hex::encode_upper(request);
        let lines = self.elm.send_lines(&command, self.timeout)?;
        let payloads = EcuPayloads::from_lines_isotp(&lines, true);

        let payload = payloads
            .get(&self.rx_id)
            .or_else(|| payloads.first().map(|(_, payload)| payload))
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        debug!(
            request = %command,
            response = %hex::encode_upper(&payload),
            "UDS exchange"
        );
        Ok(payload)
    }
}
