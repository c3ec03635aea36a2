//! K-Line session autodetection over the adapter

use std::time::Duration;

use elmscan_core::{DetectError, KLineDetector, KLineProfile, KLineSession};
use tracing::{debug, info};

use crate::channel::{Elm327, ObdReply};

const AT_TIMEOUT: Duration = Duration::from_secs(1);

/// Tries K-Line profiles with `ATSPn` and a `0100` canary
pub struct ElmKLineDetector<'a> {
    elm: &'a mut Elm327,
}

impl<'a> ElmKLineDetector<'a> {
    pub fn new(elm: &'a mut Elm327) -> Self {
        Self { elm }
    }
}

impl KLineDetector for ElmKLineDetector<'_> {
    fn detect(&mut self, candidates: &[KLineProfile]) -> Result<KLineSession, DetectError> {
        if candidates.is_empty() {
            return Err(DetectError::Aborted("no candidate profiles".into()));
        }

        let mut tried = Vec::new();
        for profile in candidates {
            tried.push(profile.name.clone());
            let select = format!("ATSP{}", profile.protocol);
            self.elm
                .send_lines(&select, AT_TIMEOUT)
                .map_err(|e| DetectError::Aborted(e.to_string()))?;

            match self.elm.send_obd("0100") {
                Ok(ObdReply::Data(hex)) if hex.contains("4100") => {
                    info!(profile = %profile.name, "K-Line session established");
                    return Ok(KLineSession {
                        profile_name: profile.name.clone(),
                        reason: format!("{} answered 0100", select),
                    });
                }
                Ok(reply) => debug!(profile = %profile.name, ?reply, "No K-Line answer"),
                Err(e) if e.is_disconnected() => return Err(DetectError::Aborted(e.to_string())),
                Err(e) => debug!(profile = %profile.name, error = %e, "K-Line probe failed"),
            }
        }

        if let Err(e) = self.elm.send_lines("ATSP0", AT_TIMEOUT) {
            debug!(error = %e, "Failed to restore automatic protocol");
        }
        Err(DetectError::Exhausted { tried })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElmConfig;
    use crate::link::MockLink;

    fn connected(mock: &MockLink) -> Elm327 {
        let mut elm = Elm327::new(Box::new(mock.clone()), ElmConfig::fast());
        elm.connect().unwrap();
        mock.clear_sent();
        elm
    }

    #[test]
    fn test_second_profile_answers() {
        let mock = MockLink::new();
        let mut elm = connected(&mock);
        mock.expect("0100", &["BUS INIT: ...ERROR"]);
        mock.expect("0100", &["BUS INIT: ...OK", "48 6B 10 41 00 BE 3E B8 11 FA"]);

        let session = ElmKLineDetector::new(&mut elm)
            .detect(&KLineProfile::defaults())
            .unwrap();
        assert_eq!(session.profile_name, "KWP2000 fast");
        assert_eq!(session.reason, "ATSP5 answered 0100");
        assert_eq!(mock.sent(), vec!["ATSP4", "0100", "ATSP5", "0100"]);
    }

    #[test]
    fn test_all_profiles_exhausted() {
        let mock = MockLink::new();
        let mut elm = connected(&mock);
        let err = ElmKLineDetector::new(&mut elm)
            .detect(&KLineProfile::defaults())
            .unwrap_err();
        assert_eq!(
            err,
            DetectError::Exhausted {
                tried: vec![
                    "KWP2000 5-baud".into(),
                    "KWP2000 fast".into(),
                    "ISO 9141-2".into()
                ]
            }
        );
    }

    #[test]
    fn test_empty_candidates() {
        let mock = MockLink::new();
        let mut elm = connected(&mock);
        let err = ElmKLineDetector::new(&mut elm).detect(&[]).unwrap_err();
        assert!(matches!(err, DetectError::Aborted(_)));
    }
}
