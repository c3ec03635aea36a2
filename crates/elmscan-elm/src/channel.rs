//! ELM327 command channel
//!
//! One exchange is: clear buffers, write `command\r`, then read until the
//! `>` prompt arrives or the bus has been silent long enough. Reaching the
//! hard timeout returns whatever was read so far.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ElmConfig;
use crate::error::{ChannelError, Result};
use crate::link::SerialLink;
use crate::normalize::hex_digits;
use crate::rawlog::{Direction, RawLog};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const AT_TIMEOUT: Duration = Duration::from_secs(1);
const RESET_TIMEOUT: Duration = Duration::from_secs(2);

/// Classified reply to an OBD request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObdReply {
    /// Uppercase hex digits of the response
    Data(String),
    NoData,
    UnableToConnect,
    Error,
    /// The adapter did not understand the command (`?`)
    Invalid,
}

impl ObdReply {
    pub fn data(&self) -> Option<&str> {
        match self {
            ObdReply::Data(hex) => Some(hex),
            _ => None,
        }
    }

    /// Classify the joined response lines
    pub fn classify(lines: &[String]) -> Self {
        let joined = lines.join(" ").to_uppercase();
        if joined.contains("NO DATA") {
            ObdReply::NoData
        } else if joined.contains("UNABLE TO CONNECT") {
            ObdReply::UnableToConnect
        } else if joined.contains("ERROR") {
            ObdReply::Error
        } else if joined.contains('?') {
            ObdReply::Invalid
        } else {
            ObdReply::Data(hex_digits(&joined))
        }
    }
}

impl std::fmt::Display for ObdReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObdReply::Data(hex) => f.write_str(hex),
            ObdReply::NoData => f.write_str("NO DATA"),
            ObdReply::UnableToConnect => f.write_str("NO CONNECT"),
            ObdReply::Error => f.write_str("ERROR"),
            ObdReply::Invalid => f.write_str("INVALID"),
        }
    }
}

/// Adapter channel over a serial link
pub struct Elm327 {
    link: Box<dyn SerialLink>,
    config: ElmConfig,
    protocol: Option<String>,
    elm_version: Option<String>,
    connected: bool,
    raw_log: Option<Box<dyn RawLog>>,
}

impl Elm327 {
    pub fn new(link: Box<dyn SerialLink>, config: ElmConfig) -> Self {
        Self {
            link,
            config,
            protocol: None,
            elm_version: None,
            connected: false,
            raw_log: None,
        }
    }

    pub fn with_raw_log(mut self, log: Box<dyn RawLog>) -> Self {
        self.raw_log = Some(log);
        self
    }

    pub fn set_raw_log(&mut self, log: Option<Box<dyn RawLog>>) {
        self.raw_log = log;
    }

    pub fn config(&self) -> &ElmConfig {
        &self.config
    }

    pub fn headers_on(&self) -> bool {
        self.config.headers_on
    }

    pub fn port(&self) -> Option<String> {
        self.link.port()
    }

    /// Point the channel at another device; closes the current one
    pub fn set_port(&mut self, port: &str) {
        self.close();
        self.link.set_port(port);
        self.config.port = Some(port.to_string());
    }

    pub fn elm_version(&self) -> Option<&str> {
        self.elm_version.as_deref()
    }

    /// Protocol name from the last `get_protocol` call
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub(crate) fn set_protocol(&mut self, name: String) {
        self.protocol = Some(name);
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.link.is_open()
    }

    /// Open the port and initialise the adapter
    pub fn connect(&mut self) -> Result<()> {
        self.close();

        if let Some(port) = self.config.port.clone() {
            if self.link.port().is_none() {
                self.link.set_port(&port);
            }
        }

        self.link
            .open()
            .map_err(|e| ChannelError::ConnectionFailed(format!("Serial port error: {}", e)))?;

        if self.config.settle_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.settle_ms));
        }

        self.connected = true;
        if let Err(e) = self.initialize() {
            self.close();
            return Err(e);
        }

        info!(
            port = ?self.link.port(),
            version = ?self.elm_version,
            "ELM327 connected"
        );
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        let banner = self.send_lines("ATZ", RESET_TIMEOUT)?;
        if banner.is_empty() {
            return Err(ChannelError::ConnectionFailed(
                "ELM327 initialization failed: no reply to ATZ".into(),
            ));
        }
        self.elm_version = Some(
            banner
                .iter()
                .find(|l| l.to_uppercase().contains("ELM"))
                .cloned()
                .unwrap_or_else(|| banner.join(" ")),
        );

        let headers = if self.config.headers_on { "ATH1" } else { "ATH0" };
        for command in ["ATE0", "ATL0", "ATS1", headers, "ATSP0"] {
            let reply = self.send_lines(command, AT_TIMEOUT)?;
            if reply.iter().any(|l| l.contains('?')) {
                return Err(ChannelError::ConnectionFailed(format!(
                    "ELM327 initialization failed: {} rejected",
                    command
                )));
            }
        }
        Ok(())
    }

    /// Send `command` and collect the reply lines
    ///
    /// The read stops at the `>` prompt, or once `min_wait` has elapsed and
    /// nothing arrived for `silence_timeout`. The `>` and carriage returns
    /// are stripped, lines trimmed and empty lines dropped.
    pub fn send_raw_lines(
        &mut self,
        command: &str,
        timeout: Duration,
        silence_timeout: Duration,
        min_wait: Duration,
    ) -> Result<Vec<String>> {
        if !self.is_connected() {
            self.connected = false;
            return Err(ChannelError::NotOpen);
        }

        match self.exchange(command, timeout, silence_timeout, min_wait) {
            Ok(lines) => Ok(lines),
            Err(e) => {
                let err = ChannelError::from_io(&e);
                if err.is_disconnected() {
                    warn!(command, error = %e, "Adapter disconnected");
                    self.close();
                } else {
                    debug!(command, error = %e, "Adapter communication error");
                }
                Err(err)
            }
        }
    }

    /// [`send_raw_lines`](Self::send_raw_lines) with the configured silence timings
    pub fn send_lines(&mut self, command: &str, timeout: Duration) -> Result<Vec<String>> {
        let silence = self.config.silence_timeout();
        let min_wait = self.config.min_wait();
        self.send_raw_lines(command, timeout, silence, min_wait)
    }

    fn exchange(
        &mut self,
        command: &str,
        timeout: Duration,
        silence_timeout: Duration,
        min_wait: Duration,
    ) -> std::io::Result<Vec<String>> {
        if let Err(e) = self.link.clear_buffers() {
            if ChannelError::from_io(&e).is_disconnected() {
                return Err(e);
            }
            debug!(error = %e, "Failed to clear serial buffers");
        }

        if let Some(log) = self.raw_log.as_mut() {
            log.record(Direction::Tx, command, &[]);
        }

        self.link.write_all(format!("{}\r", command).as_bytes())?;
        self.link.flush()?;

        let mut buf = Vec::new();
        let start = Instant::now();
        let mut last_rx = start;

        loop {
            let now = Instant::now();
            if now.duration_since(start) > timeout {
                debug!(command, bytes = buf.len(), "Read timed out");
                break;
            }

            if self.link.bytes_to_read()? > 0 {
                self.link.read_available(&mut buf)?;
                last_rx = now;
                if buf.contains(&b'>') {
                    break;
                }
            } else {
                if now.duration_since(start) >= min_wait
                    && now.duration_since(last_rx) > silence_timeout
                {
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
        }

        let text = String::from_utf8_lossy(&buf).replace('>', "").replace('\r', "\n");
        let lines: Vec<String> = text
            .split('\n')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        debug!(command, lines = lines.len(), "ELM327 exchange");
        if let Some(log) = self.raw_log.as_mut() {
            log.record(Direction::Rx, command, &lines);
        }
        Ok(lines)
    }

    /// Reply lines joined with spaces
    pub fn send_raw(&mut self, command: &str, timeout: Option<Duration>) -> Result<String> {
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        Ok(self.send_lines(command, timeout)?.join(" "))
    }

    /// Send an OBD request and classify the reply
    pub fn send_obd(&mut self, command: &str) -> Result<ObdReply> {
        let lines = self.send_obd_lines(command)?;
        Ok(ObdReply::classify(&lines))
    }

    /// Send an OBD request and return the raw reply lines
    pub fn send_obd_lines(&mut self, command: &str) -> Result<Vec<String>> {
        let timeout = self.config.obd_timeout();
        self.send_lines(command, timeout)
    }

    /// `0100` canary: true when the vehicle answers `41 00`
    pub fn test_vehicle_connection(&mut self) -> Result<bool> {
        Ok(self
            .send_obd("0100")?
            .data()
            .is_some_and(|hex| hex.contains("4100")))
    }

    pub fn close(&mut self) {
        if self.connected {
            debug!(port = ?self.link.port(), "Closing ELM327 channel");
        }
        self.connected = false;
        self.link.close();
    }
}

impl Drop for Elm327 {
    fn drop(&mut self) {
        self.close();
    }
}
