//! Adapter channel configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serial and timing settings for one adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElmConfig {
    /// Serial device (e.g. "/dev/ttyUSB0"); discovered when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
    /// Hard limit for one exchange
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Gap after the last byte that ends a reply without a prompt
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,
    /// Silence is only honoured after this much time has passed
    #[serde(default = "default_min_wait_ms")]
    pub min_wait_ms: u64,
    /// Ask the adapter to print CAN headers (`ATH1`)
    #[serde(default = "default_headers_on")]
    pub headers_on: bool,
    /// Pause after opening the port before the reset
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_baudrate() -> u32 {
    38400
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_silence_timeout_ms() -> u64 {
    250
}

fn default_min_wait_ms() -> u64 {
    750
}

fn default_headers_on() -> bool {
    true
}

fn default_settle_ms() -> u64 {
    200
}

impl Default for ElmConfig {
    fn default() -> Self {
        Self {
            port: None,
            baudrate: default_baudrate(),
            timeout_ms: default_timeout_ms(),
            silence_timeout_ms: default_silence_timeout_ms(),
            min_wait_ms: default_min_wait_ms(),
            headers_on: default_headers_on(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl ElmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(self.min_wait_ms)
    }

    /// Timeout used for OBD requests (never below 2 s)
    pub fn obd_timeout(&self) -> Duration {
        self.timeout().max(Duration::from_secs(2))
    }

    /// Settings for scripted links: no settle pause, short silence window
    pub fn fast() -> Self {
        Self {
            timeout_ms: 200,
            silence_timeout_ms: 10,
            min_wait_ms: 0,
            settle_ms: 0,
            ..Default::default()
        }
    }
}
