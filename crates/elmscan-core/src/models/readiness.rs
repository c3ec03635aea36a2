//! Readiness monitor status (Mode 01 PID 01)

use serde::{Deserialize, Serialize};

/// Completion state of one emissions self-test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessStatus {
    pub monitor_name: String,
    /// Whether the vehicle supports this monitor
    pub available: bool,
    /// Whether the monitor finished; always false when not available
    pub complete: bool,
}

impl ReadinessStatus {
    pub fn new(monitor_name: impl Into<String>, available: bool, complete: bool) -> Self {
        Self {
            monitor_name: monitor_name.into(),
            available,
            complete: available && complete,
        }
    }

    pub fn status_str(&self) -> &'static str {
        if !self.available {
            "N/A"
        } else if self.complete {
            "Complete"
        } else {
            "Incomplete"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_monitor_is_never_complete() {
        let status = ReadinessStatus::new("Catalyst", false, true);
        assert!(!status.complete);
        assert_eq!(status.status_str(), "N/A");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ReadinessStatus::new("EGR", true, true).status_str(), "Complete");
        assert_eq!(ReadinessStatus::new("EGR", true, false).status_str(), "Incomplete");
    }
}
