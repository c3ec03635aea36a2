//! DTC decoding (Modes 03 / 07 / 0A)
//!
//! A DTC is two bytes. The top two bits of the first nibble pick the
//! system letter, the low two bits are the second character and the
//! remaining three nibbles pass through:
//!
//! ```text
//! 0133 -> P0133    4133 -> C0133    8133 -> B0133    C133 -> U0133
//! ```

/// Prefix of codes that failed to decode
pub const INVALID_PREFIX: &str = "INVALID:";

const SYSTEMS: [char; 4] = ['P', 'C', 'B', 'U'];

/// Decode four hex characters into a DTC string
///
/// Anything other than exactly four hex digits yields `INVALID:<input>`.
pub fn decode(hex4: &str) -> String {
    if hex4.len() != 4 || !hex4.chars().all(|c| c.is_ascii_hexdigit()) {
        return format!("{}{}", INVALID_PREFIX, hex4);
    }
    let upper = hex4.to_ascii_uppercase();
    let Some(first) = upper.chars().next().and_then(|c| c.to_digit(16)) else {
        return format!("{}{}", INVALID_PREFIX, hex4);
    };
    let system = SYSTEMS[((first >> 2) & 0x03) as usize];
    format!("{}{}{}", system, first & 0x03, &upper[1..])
}

/// Decode a DTC from its two raw bytes
pub fn decode_bytes(high: u8, low: u8) -> String {
    decode(&format!("{:02X}{:02X}", high, low))
}

pub fn is_invalid(code: &str) -> bool {
    code.starts_with(INVALID_PREFIX)
}

/// Whether `code` is a well-formed DTC (`[PCBU][0-3][0-9A-F]{3}`)
pub fn is_valid_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 5
        && matches!(bytes[0], b'P' | b'C' | b'B' | b'U')
        && (b'0'..=b'3').contains(&bytes[1])
        && bytes[2..]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
}

/// Response echo byte for a DTC mode
pub fn mode_echo(mode: &str) -> &'static str {
    match mode.to_ascii_uppercase().as_str() {
        "07" => "47",
        "0A" => "4A",
        _ => "43",
    }
}

/// Extract DTCs from a hex response
///
/// A leading mode echo is removed, the rest is read four characters at a
/// time; `0000` groups, a trailing partial group and undecodable groups
/// are skipped.
pub fn parse(response: &str, mode: &str) -> Vec<String> {
    let compact: String = response
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if compact.is_empty() {
        return Vec::new();
    }

    let body = compact
        .strip_prefix(mode_echo(mode))
        .unwrap_or(compact.as_str());

    body.as_bytes()
        .chunks_exact(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter(|chunk| *chunk != "0000")
        .map(decode)
        .filter(|code| !is_invalid(code))
        .collect()
}
