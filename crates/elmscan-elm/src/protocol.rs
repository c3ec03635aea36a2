//! Protocol negotiation and query

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::Elm327;
use crate::error::{ChannelError, Result};

/// `ATSPn` candidates tried during negotiation, in order
pub const NEGOTIATION_CANDIDATES: [&str; 5] = ["0", "6", "7", "8", "9"];

const AT_TIMEOUT: Duration = Duration::from_secs(1);
const SWITCH_DELAY: Duration = Duration::from_millis(50);

const PROTOCOL_NAMES: &[(char, &str)] = &[
    ('1', "SAE J1850 PWM"),
    ('2', "SAE J1850 VPW"),
    ('3', "ISO 9141-2"),
    ('4', "ISO 14230-4 KWP (5 baud init)"),
    ('5', "ISO 14230-4 KWP (fast init)"),
    ('6', "ISO 15765-4 CAN (11 bit, 500 kbaud)"),
    ('7', "ISO 15765-4 CAN (29 bit, 500 kbaud)"),
    ('8', "ISO 15765-4 CAN (11 bit, 250 kbaud)"),
    ('9', "ISO 15765-4 CAN (29 bit, 250 kbaud)"),
    ('A', "SAE J1939 CAN"),
];

/// Name of adapter protocol number `code`
pub fn protocol_name(code: char) -> Option<&'static str> {
    let code = code.to_ascii_uppercase();
    PROTOCOL_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Protocol number from an `ATDPN` reply
///
/// A two-character reply starting with `A` marks an automatically selected
/// protocol; the marker is skipped.
pub fn parse_dpn(reply: &str) -> Option<char> {
    let reply = reply.trim().to_uppercase();
    let code = match reply.strip_prefix('A') {
        Some(rest) if !rest.is_empty() => rest,
        _ => reply.as_str(),
    };
    code.chars().find(|c| c.is_ascii_hexdigit())
}

impl Elm327 {
    /// Find a protocol the vehicle answers on
    ///
    /// Each candidate gets `ATSPn` followed by a `0100` canary; the first
    /// reply containing `4100` wins. `ATSP0` is sent afterwards either way.
    pub fn negotiate_protocol(&mut self) -> Result<String> {
        let outcome = self.try_candidates();
        if let Err(e) = self.send_lines("ATSP0", AT_TIMEOUT) {
            debug!(error = %e, "Failed to restore automatic protocol");
        }
        match &outcome {
            Ok(p) => info!(protocol = %p, "Protocol negotiated"),
            Err(e) => warn!(error = %e, "Protocol negotiation failed"),
        }
        outcome
    }

    fn try_candidates(&mut self) -> Result<String> {
        let timeout = self.config().obd_timeout();
        for candidate in NEGOTIATION_CANDIDATES {
            self.send_lines(&format!("ATSP{}", candidate), AT_TIMEOUT)?;
            thread::sleep(SWITCH_DELAY);
            let lines = self.send_lines("0100", timeout)?;
            let joined = lines.join("").to_uppercase().replace(' ', "");
            if joined.contains("4100") {
                return Ok(candidate.to_string());
            }
        }
        Err(ChannelError::Negotiation("0100 did not respond".into()))
    }

    /// Protocol currently used by the adapter (`ATDPN`)
    ///
    /// Never fails: a dead channel yields `"Unknown (disconnected)"` and an
    /// unrecognised reply `"Unknown: <reply>"`.
    pub fn get_protocol(&mut self) -> String {
        let reply = match self.send_raw("ATDPN", Some(AT_TIMEOUT)) {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "ATDPN failed");
                return "Unknown (disconnected)".to_string();
            }
        };

        match parse_dpn(&reply).and_then(protocol_name) {
            Some(name) => {
                self.set_protocol(name.to_string());
                name.to_string()
            }
            None => format!("Unknown: {}", reply.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElmConfig;
    use crate::link::MockLink;

    #[test]
    fn test_parse_dpn() {
        assert_eq!(parse_dpn("A6"), Some('6'));
        assert_eq!(parse_dpn("6"), Some('6'));
        assert_eq!(parse_dpn("A"), Some('A'));
        assert_eq!(parse_dpn("a8\r"), Some('8'));
        assert_eq!(parse_dpn(""), None);
    }

    #[test]
    fn test_get_protocol() {
        let mock = MockLink::new();
        let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
        elm.connect().unwrap();

        assert_eq!(elm.get_protocol(), "ISO 15765-4 CAN (11 bit, 500 kbaud)");
        assert_eq!(elm.protocol(), Some("ISO 15765-4 CAN (11 bit, 500 kbaud)"));

        mock.expect("ATDPN", &["STOPPED"]);
        assert_eq!(elm.get_protocol(), "Unknown: STOPPED");

        elm.close();
        assert_eq!(elm.get_protocol(), "Unknown (disconnected)");
    }

    #[test]
    fn test_negotiation_first_answer_wins() {
        let mock = MockLink::new();
        let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
        elm.connect().unwrap();
        mock.clear_sent();

        mock.expect("0100", &["NO DATA"]);
        mock.expect("0100", &["7E8 06 41 00 BE 3E B8 11"]);

        assert_eq!(elm.negotiate_protocol().unwrap(), "6");
        assert_eq!(mock.sent(), vec!["ATSP0", "0100", "ATSP6", "0100", "ATSP0"]);
    }

    #[test]
    fn test_negotiation_failure_restores_auto() {
        let mock = MockLink::new();
        let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
        elm.connect().unwrap();
        mock.clear_sent();

        let err = elm.negotiate_protocol().unwrap_err();
        assert!(matches!(err, ChannelError::Negotiation(_)));
        let sent = mock.sent();
        assert_eq!(sent.len(), 11);
        assert_eq!(sent.last().map(String::as_str), Some("ATSP0"));
    }
}
