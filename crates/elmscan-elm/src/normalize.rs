//! Response normalizer
//!
//! Turns adapter response lines into `{ecu -> payload bytes}`:
//!
//! 1. drop status/noise lines (`SEARCHING...`, `NO DATA`, `OK`, ...)
//! 2. tokenize into uppercase hex tokens, rejecting lines with anything else
//! 3. group by the first token when headers are on, else into [`NO_HEADER`]
//! 4. per line strip the ECU token and a plausible length byte
//! 5. concatenate frames per ECU in arrival order
//!
//! [`EcuPayloads::find_prefix`] then locates the expected response prefix,
//! preferring the given ECUs. Everything here is pure.

/// Status lines the adapter mixes into responses
pub const NOISE_PREFIXES: &[&str] = &[
    "SEARCHING",
    "BUS INIT",
    "UNABLE TO CONNECT",
    "STOPPED",
    "NO DATA",
    "?",
    "ELM",
    "OK",
    "CAN ERROR",
    "BUS ERROR",
    "BUFFER FULL",
    "DATA ERROR",
    "FB ERROR",
];

/// Bucket used when headers are off
pub const NO_HEADER: &str = "NOHDR";

/// First occurrence of an expected prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadMatch {
    pub ecu: String,
    /// Payload from the match offset to the end
    pub payload: Vec<u8>,
}

/// Payload bytes per responding ECU, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EcuPayloads {
    entries: Vec<(String, Vec<u8>)>,
}

pub fn is_noise(line: &str) -> bool {
    let up = line.trim().to_uppercase();
    NOISE_PREFIXES.iter().any(|prefix| up.starts_with(prefix))
}

/// Split a line into uppercase hex tokens
///
/// Returns `None` for empty lines and lines with any character other than
/// hex digits and whitespace.
pub fn tokenize(line: &str) -> Option<Vec<String>> {
    if !line.chars().all(|c| c.is_ascii_hexdigit() || c.is_whitespace()) {
        return None;
    }
    let tokens: Vec<String> = line.split_whitespace().map(str::to_uppercase).collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

/// Group tokenized lines by ECU, keeping first-seen order
pub fn group_by_ecu<S: AsRef<str>>(lines: &[S], headers_on: bool) -> Vec<(String, Vec<Vec<String>>)> {
    let mut groups: Vec<(String, Vec<Vec<String>>)> = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() || is_noise(line) {
            continue;
        }
        let Some(tokens) = tokenize(line) else {
            continue;
        };
        let ecu = if headers_on {
            tokens[0].clone()
        } else {
            NO_HEADER.to_string()
        };
        match groups.iter_mut().find(|(name, _)| *name == ecu) {
            Some((_, frames)) => frames.push(tokens),
            None => groups.push((ecu, vec![tokens])),
        }
    }
    groups
}

fn frame_bytes(tokens: &[String], headers_on: bool) -> Option<Vec<u8>> {
    let rest = if headers_on { tokens.get(1..)? } else { tokens };
    rest.iter()
        .map(|t| {
            if t.len() <= 2 {
                u8::from_str_radix(t, 16).ok()
            } else {
                None
            }
        })
        .collect()
}

/// Payload bytes of one line: ECU token and plausible length byte removed
///
/// A frame with a token that is not a single byte yields `None`.
pub fn payload_from_tokens(tokens: &[String], headers_on: bool) -> Option<Vec<u8>> {
    let mut bytes = frame_bytes(tokens, headers_on)?;
    if let Some(&len) = bytes.first() {
        if len > 0 && (len as usize) < bytes.len() {
            bytes.remove(0);
        }
    }
    Some(bytes)
}

/// Strip an ISO-TP frame header
///
/// First frames (`1X LL`) yield the declared total length as well;
/// consecutive frames (`21`..`2F`) lose their sequence byte; single frames
/// are cut to their length byte.
pub fn strip_isotp_header(bytes: &[u8]) -> (Vec<u8>, Option<usize>) {
    match bytes {
        [pci, len, rest @ ..] if pci & 0xF0 == 0x10 => {
            let total = (((*pci & 0x0F) as usize) << 8) | *len as usize;
            (rest.to_vec(), Some(total))
        }
        [pci, rest @ ..] if (0x21..=0x2F).contains(pci) => (rest.to_vec(), None),
        [pci, rest @ ..] if *pci > 0 && (*pci as usize) <= rest.len() => {
            (rest[..*pci as usize].to_vec(), None)
        }
        _ => (bytes.to_vec(), None),
    }
}

impl EcuPayloads {
    /// Normalize plain OBD response lines
    pub fn from_lines<S: AsRef<str>>(lines: &[S], headers_on: bool) -> Self {
        let entries = group_by_ecu(lines, headers_on)
            .into_iter()
            .map(|(ecu, frames)| {
                let payload = frames
                    .iter()
                    .filter_map(|tokens| payload_from_tokens(tokens, headers_on))
                    .flatten()
                    .collect();
                (ecu, payload)
            })
            .collect();
        Self { entries }
    }

    /// Normalize ISO-TP framed lines (multi-frame VIN, UDS responses)
    pub fn from_lines_isotp<S: AsRef<str>>(lines: &[S], headers_on: bool) -> Self {
        let entries = group_by_ecu(lines, headers_on)
            .into_iter()
            .map(|(ecu, frames)| {
                let mut payload = Vec::new();
                let mut declared = None;
                for tokens in &frames {
                    let Some(bytes) = frame_bytes(tokens, headers_on) else {
                        continue;
                    };
                    let (data, total) = strip_isotp_header(&bytes);
                    if total.is_some() {
                        declared = total;
                    }
                    payload.extend(data);
                }
                if let Some(total) = declared {
                    payload.truncate(total);
                }
                (ecu, payload)
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, ecu: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(ecu))
            .map(|(_, payload)| payload.as_slice())
    }

    pub fn first(&self) -> Option<(&str, &[u8])> {
        self.entries
            .first()
            .map(|(ecu, payload)| (ecu.as_str(), payload.as_slice()))
    }

    pub fn ecus(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ecu, _)| ecu.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(ecu, payload)| (ecu.as_str(), payload.as_slice()))
    }

    /// Search preferred ECUs first, then the rest in arrival order
    pub fn find_prefix(&self, expected: &[u8], prefer: &[&str]) -> Option<PayloadMatch> {
        let preferred = prefer.iter().filter_map(|p| {
            self.entries
                .iter()
                .find(|(ecu, _)| ecu.eq_ignore_ascii_case(p))
        });
        let others = self
            .entries
            .iter()
            .filter(|(ecu, _)| !prefer.iter().any(|p| ecu.eq_ignore_ascii_case(p)));

        preferred.chain(others).find_map(|(ecu, payload)| {
            find_subsequence(payload, expected).map(|offset| PayloadMatch {
                ecu: ecu.clone(),
                payload: payload[offset..].to_vec(),
            })
        })
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Normalize `lines` and locate `expected` in one step
pub fn find_obd_response_payload<S: AsRef<str>>(
    lines: &[S],
    expected: &[u8],
    headers_on: bool,
    prefer: &[&str],
) -> Option<PayloadMatch> {
    EcuPayloads::from_lines(lines, headers_on).find_prefix(expected, prefer)
}

/// Printable ASCII characters of `bytes`
pub fn ascii_printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| b.is_ascii_graphic() || **b == b' ')
        .map(|&b| b as char)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Hex digits of a response, uppercase with everything else removed
pub fn hex_digits(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_noise_lines_dropped() {
        let lines = ["SEARCHING...", "BUS INIT: ...OK", "7E8 03 41 0D 32", "NO DATA"];
        let payloads = EcuPayloads::from_lines(&lines, true);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads.get("7E8"), Some(&[0x41, 0x0D, 0x32][..]));
    }

    #[test]
    fn test_non_hex_line_rejected() {
        assert_eq!(tokenize("0: 49 02 01"), None);
        assert_eq!(tokenize("41 0c"), Some(vec!["41".to_string(), "0C".to_string()]));
        assert_eq!(tokenize("   "), None);
    }

    #[test]
    fn test_two_ecus_form_two_buckets() {
        let lines = ["7E8 06 41 00 BE 3E B8 11", "7E0 06 41 00 80 00 00 01"];
        let payloads = EcuPayloads::from_lines(&lines, true);
        let ecus: Vec<&str> = payloads.ecus().collect();
        assert_eq!(ecus, vec!["7E8", "7E0"]);
    }

    #[test]
    fn test_length_byte_rule() {
        let tokens = |s: &str| tokenize(s).unwrap();
        // equal to the remaining count: stripped
        assert_eq!(
            payload_from_tokens(&tokens("7E8 03 41 0D 32"), true),
            Some(vec![0x41, 0x0D, 0x32])
        );
        // one larger than the remaining count: kept
        assert_eq!(
            payload_from_tokens(&tokens("7E8 04 41 0D 32"), true),
            Some(vec![0x04, 0x41, 0x0D, 0x32])
        );
        // zero is never a length
        assert_eq!(
            payload_from_tokens(&tokens("00 41 0D"), false),
            Some(vec![0x00, 0x41, 0x0D])
        );
    }

    #[test]
    fn test_headers_off_single_bucket() {
        let lines = ["41 0C 1A F8", "41 0C 1B 00"];
        let payloads = EcuPayloads::from_lines(&lines, false);
        assert_eq!(payloads.ecus().collect::<Vec<_>>(), vec![NO_HEADER]);
        assert_eq!(
            payloads.get(NO_HEADER),
            Some(&[0x41, 0x0C, 0x1A, 0xF8, 0x41, 0x0C, 0x1B, 0x00][..])
        );
    }

    #[test]
    fn test_prefix_search_prefers_ecu() {
        let lines = ["7E0 03 41 0D 10", "7E8 03 41 0D 32"];
        let payloads = EcuPayloads::from_lines(&lines, true);

        let hit = payloads.find_prefix(&[0x41, 0x0D], &["7E8"]).unwrap();
        assert_eq!(hit.ecu, "7E8");
        assert_eq!(hit.payload, vec![0x41, 0x0D, 0x32]);

        let hit = payloads.find_prefix(&[0x41, 0x0D], &[]).unwrap();
        assert_eq!(hit.ecu, "7E0");
    }

    #[test]
    fn test_prefix_match_returns_rest_of_payload() {
        let lines = ["7E8 10 14 49 02 01 31 44 34"];
        let hit = find_obd_response_payload(&lines, &[0x49, 0x02], true, &[]).unwrap();
        assert_eq!(hit.payload, vec![0x49, 0x02, 0x01, 0x31, 0x44, 0x34]);
        assert!(find_obd_response_payload(&lines, &[0x41, 0x00], true, &[]).is_none());
    }

    #[test]
    fn test_isotp_multi_frame_vin() {
        let lines = [
            "7E8 10 14 49 02 01 31 47 31",
            "7E8 21 4A 43 35 34 34 34 52",
            "7E8 22 37 32 35 32 33 36 37",
        ];
        let payloads = EcuPayloads::from_lines_isotp(&lines, true);
        let payload = payloads.get("7E8").unwrap();
        assert_eq!(payload.len(), 0x14);
        assert_eq!(&payload[..3], &[0x49, 0x02, 0x01]);
        assert_eq!(ascii_printable(&payload[3..]), "1G1JC5444R7252367");
    }

    #[test]
    fn test_isotp_single_frame_drops_padding() {
        let lines = ["7E8 03 7F 22 31 AA AA AA AA"];
        let payloads = EcuPayloads::from_lines_isotp(&lines, true);
        assert_eq!(payloads.get("7E8"), Some(&[0x7F, 0x22, 0x31][..]));
    }

    #[test]
    fn test_hex_digits() {
        assert_eq!(hex_digits("41 00 be 3e\r>"), "4100BE3E");
    }
}
