//! Adapter channel errors

use thiserror::Error;

/// Result type for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The adapter went away; the channel is unusable until reconnected
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected to ELM327")]
    NotOpen,

    #[error("No ELM327 adapter found. Check USB connection.")]
    NoPorts,

    #[error("Protocol negotiation failed: {0}")]
    Negotiation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChannelError {
    /// Classify a link I/O fault by its text
    pub fn from_io(err: &std::io::Error) -> Self {
        let text = err.to_string();
        let lower = text.to_lowercase();
        if lower.contains("device not configured") || lower.contains("disconnected") {
            ChannelError::Disconnected(text)
        } else {
            ChannelError::Communication(text)
        }
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, ChannelError::Disconnected(_) | ChannelError::NotOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_classification() {
        let err = io::Error::new(io::ErrorKind::Other, "Device not configured");
        assert!(matches!(ChannelError::from_io(&err), ChannelError::Disconnected(_)));

        let err = io::Error::new(io::ErrorKind::BrokenPipe, "port was DISCONNECTED");
        assert!(ChannelError::from_io(&err).is_disconnected());

        let err = io::Error::new(io::ErrorKind::TimedOut, "Operation timed out");
        assert_eq!(
            ChannelError::from_io(&err),
            ChannelError::Communication("Operation timed out".into())
        );
    }
}
