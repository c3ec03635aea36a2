//! Scanner errors

use elmscan_elm::ChannelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Not connected to vehicle")]
    NotConnected,

    /// The adapter went away mid-operation; the scanner is Disconnected
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Scanner error: {0}")]
    Scanner(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("No response from vehicle ECU")]
    NoResponse,
}

impl From<ChannelError> for ScanError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Disconnected(msg) => ScanError::ConnectionLost(msg),
            ChannelError::NotOpen => ScanError::ConnectionLost("Device disconnected".into()),
            ChannelError::Communication(msg) => {
                ScanError::Scanner(format!("Communication error: {}", msg))
            }
            other => ScanError::ConnectFailed(other.to_string()),
        }
    }
}
