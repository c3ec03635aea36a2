//! DID value decoders selected by the catalog's `decoder` tag

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DidDecoder {
    /// 7-bit ASCII, surrounding whitespace and NUL padding trimmed
    Ascii,
    /// Big-endian unsigned integer
    Uint,
    /// Uppercase hex without separators
    #[default]
    Hex,
}

impl DidDecoder {
    /// Unknown or missing tags decode as hex
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_lowercase()).as_deref() {
            Some("ascii") => Self::Ascii,
            Some("uint") => Self::Uint,
            _ => Self::Hex,
        }
    }

    pub fn decode(self, data: &[u8]) -> DidValue {
        match self {
            Self::Ascii => DidValue::Text(decode_ascii(data)),
            // Wider values do not fit in u64 and fall back to hex
            Self::Uint if data.len() <= 8 => DidValue::Number(decode_uint(data)),
            Self::Uint | Self::Hex => DidValue::Text(hex::encode_upper(data)),
        }
    }
}

/// A decoded DID value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DidValue {
    Text(String),
    Number(u64),
}

impl fmt::Display for DidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

pub fn decode_ascii(data: &[u8]) -> String {
    data.iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect::<String>()
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

pub fn decode_uint(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tags() {
        assert_eq!(DidDecoder::from_tag(Some("ascii")), DidDecoder::Ascii);
        assert_eq!(DidDecoder::from_tag(Some(" UINT ")), DidDecoder::Uint);
        assert_eq!(DidDecoder::from_tag(Some("hex")), DidDecoder::Hex);
        assert_eq!(DidDecoder::from_tag(Some("bcd")), DidDecoder::Hex);
        assert_eq!(DidDecoder::from_tag(None), DidDecoder::Hex);
    }

    #[test]
    fn test_ascii() {
        let value = DidDecoder::Ascii.decode(b" 68RE1234AB\0\0");
        assert_eq!(value, DidValue::Text("68RE1234AB".to_string()));
        // Non-ASCII bytes are dropped
        assert_eq!(decode_ascii(&[0x41, 0xFF, 0x42]), "AB");
    }

    #[test]
    fn test_uint() {
        assert_eq!(DidDecoder::Uint.decode(&[0x01, 0x02]), DidValue::Number(258));
        assert_eq!(DidDecoder::Uint.decode(&[]), DidValue::Number(0));
        assert_eq!(
            DidDecoder::Uint.decode(&[0xFF; 9]),
            DidValue::Text("FFFFFFFFFFFFFFFFFF".to_string())
        );
    }

    #[test]
    fn test_hex_and_display() {
        let value = DidDecoder::Hex.decode(&[0x0a, 0xBC]);
        assert_eq!(value.to_string(), "0ABC");
        assert_eq!(DidValue::Number(42).to_string(), "42");
        assert_eq!(serde_json::to_string(&DidValue::Number(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&DidValue::Text("0ABC".into())).unwrap(),
            "\"0ABC\""
        );
    }
}
