//! UDS client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Addressing and timing for one UDS target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdsClientConfig {
    /// Request CAN id (`ATSH`)
    #[serde(default = "default_tx_id")]
    pub tx_id: String,

    /// Response CAN id (`ATCRA` filter)
    #[serde(default = "default_rx_id")]
    pub rx_id: String,

    /// ELM327 protocol number, `6` is ISO 15765-4 CAN 11/500
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Configure the adapter before the first request
    #[serde(default = "default_auto_configure")]
    pub auto_configure: bool,

    /// Per-exchange timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_tx_id() -> String {
    "7E0".to_string()
}

fn default_rx_id() -> String {
    "7E8".to_string()
}

fn default_protocol() -> String {
    "6".to_string()
}

fn default_auto_configure() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for UdsClientConfig {
    fn default() -> Self {
        Self {
            tx_id: default_tx_id(),
            rx_id: default_rx_id(),
            protocol: default_protocol(),
            auto_configure: default_auto_configure(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl UdsClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Same settings addressed to another ECU
    pub fn with_ids(mut self, tx_id: &str, rx_id: &str) -> Self {
        self.tx_id = tx_id.trim().to_uppercase();
        self.rx_id = rx_id.trim().to_uppercase();
        self
    }
}
