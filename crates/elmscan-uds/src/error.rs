//! UDS client errors

use elmscan_elm::ChannelError;
use thiserror::Error;

use crate::nrc::NegativeResponseCode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UdsError {
    /// ECU answered `7F <sid> <nrc>`
    #[error("Negative response: {nrc} (0x{nrc:02X}) for service 0x{service_id:02X}")]
    NegativeResponse {
        service_id: u8,
        nrc: NegativeResponseCode,
    },

    /// Empty, truncated or otherwise malformed response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Positive response for a different service
    #[error("Unexpected response SID 0x{actual:02X} (expected 0x{expected:02X})")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Unknown module '{module}' for brand '{brand}'")]
    UnknownModule { brand: String, module: String },

    #[error("Unknown routine: {0}")]
    UnknownRoutine(String),

    #[error("Unknown DID: {0}")]
    UnknownDid(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, UdsError>;

fn clean_hex(s: &str) -> String {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parse a DID such as `F190`, `0xF190` or `f1 90`
pub fn parse_did(s: &str) -> Result<u16> {
    let cleaned = clean_hex(s);
    if cleaned.is_empty() || cleaned.len() > 4 {
        return Err(UdsError::UnknownDid(s.trim().to_string()));
    }
    u16::from_str_radix(&cleaned, 16).map_err(|_| UdsError::UnknownDid(s.trim().to_string()))
}

/// Parse a hex byte string such as `01 02` or `0x0102`; empty input is no bytes
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    let cleaned = clean_hex(s);
    hex::decode(&cleaned).map_err(|e| UdsError::InvalidHex(format!("'{}': {}", s.trim(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_did() {
        assert_eq!(parse_did("F190").unwrap(), 0xF190);
        assert_eq!(parse_did("0xf190").unwrap(), 0xF190);
        assert_eq!(parse_did(" F1 90 ").unwrap(), 0xF190);
        assert_eq!(parse_did("0x1").unwrap(), 0x0001);
        assert!(matches!(parse_did("F1900"), Err(UdsError::UnknownDid(_))));
        assert!(matches!(parse_did("VIN"), Err(UdsError::UnknownDid(_))));
        assert!(parse_did("").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("01 02").unwrap(), vec![0x01, 0x02]);
        assert_eq!(parse_hex_bytes("0xABcd").unwrap(), vec![0xAB, 0xCD]);
        assert_eq!(parse_hex_bytes("").unwrap(), Vec::<u8>::new());
        assert!(matches!(parse_hex_bytes("123"), Err(UdsError::InvalidHex(_))));
        assert!(matches!(parse_hex_bytes("zz"), Err(UdsError::InvalidHex(_))));
    }

    #[test]
    fn test_negative_response_message() {
        let err = UdsError::NegativeResponse {
            service_id: 0x22,
            nrc: NegativeResponseCode::from(0x31),
        };
        assert_eq!(
            err.to_string(),
            "Negative response: Request out of range (0x31) for service 0x22"
        );
    }
}
