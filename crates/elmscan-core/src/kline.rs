//! Legacy K-Line session autodetection interface
//!
//! Detection itself lives next to the adapter; the core only fixes the
//! candidate profiles and the shape of the result.

use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// One K-Line protocol candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KLineProfile {
    /// Display name (e.g. "KWP2000 5-baud")
    pub name: String,
    /// Adapter protocol number used with `ATSPn`
    pub protocol: String,
}

impl KLineProfile {
    pub fn new(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
        }
    }

    /// Candidates in preference order
    pub fn defaults() -> Vec<KLineProfile> {
        vec![
            KLineProfile::new("KWP2000 5-baud", "4"),
            KLineProfile::new("KWP2000 fast", "5"),
            KLineProfile::new("ISO 9141-2", "3"),
        ]
    }
}

/// Session established by a detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KLineSession {
    pub profile_name: String,
    /// Why this profile was accepted
    pub reason: String,
}

/// Black-box K-Line autodetection
pub trait KLineDetector {
    /// Try `candidates` in order; the first that answers wins
    fn detect(&mut self, candidates: &[KLineProfile]) -> Result<KLineSession, DetectError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_profile_order() {
        let names: Vec<String> = KLineProfile::defaults().into_iter().map(|p| p.protocol).collect();
        assert_eq!(names, vec!["4", "5", "3"]);
    }

    #[test]
    fn test_exhausted_error_lists_profiles() {
        let err = DetectError::Exhausted {
            tried: vec!["KWP2000 5-baud".into(), "ISO 9141-2".into()],
        };
        assert_eq!(
            err.to_string(),
            "K-Line detection failed after trying: KWP2000 5-baud, ISO 9141-2"
        );
    }
}
