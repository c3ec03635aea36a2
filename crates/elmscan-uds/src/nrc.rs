//! UDS negative response codes (ISO 14229-1 Annex A)

use std::fmt;

macro_rules! nrc_table {
    ($($variant:ident = $code:literal => $text:literal,)*) => {
        /// Negative response code carried in a `7F <sid> <nrc>` reply
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NegativeResponseCode {
            $($variant,)*
            /// Reserved or manufacturer specific
            Unknown(u8),
        }

        impl NegativeResponseCode {
            pub fn code(self) -> u8 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unknown(code) => code,
                }
            }

            /// Human readable name
            pub fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                    Self::Unknown(_) => "Unknown negative response",
                }
            }
        }

        impl From<u8> for NegativeResponseCode {
            fn from(value: u8) -> Self {
                match value {
                    $($code => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }
        }
    };
}

nrc_table! {
    GeneralReject = 0x10 => "General reject",
    ServiceNotSupported = 0x11 => "Service not supported",
    SubFunctionNotSupported = 0x12 => "Sub-function not supported",
    IncorrectMessageLengthOrFormat = 0x13 => "Incorrect message length or invalid format",
    ResponseTooLong = 0x14 => "Response too long",
    BusyRepeatRequest = 0x21 => "Busy, repeat request",
    ConditionsNotCorrect = 0x22 => "Conditions not correct",
    RequestSequenceError = 0x24 => "Request sequence error",
    NoResponseFromSubnet = 0x25 => "No response from subnet component",
    FailurePreventsExecution = 0x26 => "Failure prevents execution of requested action",
    RequestOutOfRange = 0x31 => "Request out of range",
    SecurityAccessDenied = 0x33 => "Security access denied",
    InvalidKey = 0x35 => "Invalid key",
    ExceededNumberOfAttempts = 0x36 => "Exceeded number of attempts",
    RequiredTimeDelayNotExpired = 0x37 => "Required time delay not expired",
    UploadDownloadNotAccepted = 0x70 => "Upload/download not accepted",
    TransferDataSuspended = 0x71 => "Transfer data suspended",
    GeneralProgrammingFailure = 0x72 => "General programming failure",
    WrongBlockSequenceCounter = 0x73 => "Wrong block sequence counter",
    ResponsePending = 0x78 => "Request correctly received, response pending",
    SubFunctionNotSupportedInActiveSession = 0x7E => "Sub-function not supported in active session",
    ServiceNotSupportedInActiveSession = 0x7F => "Service not supported in active session",
    RpmTooHigh = 0x81 => "RPM too high",
    RpmTooLow = 0x82 => "RPM too low",
    EngineRunning = 0x83 => "Engine is running",
    EngineNotRunning = 0x84 => "Engine is not running",
    EngineRunTimeTooLow = 0x85 => "Engine run time too low",
    TemperatureTooHigh = 0x86 => "Temperature too high",
    TemperatureTooLow = 0x87 => "Temperature too low",
    VehicleSpeedTooHigh = 0x88 => "Vehicle speed too high",
    VehicleSpeedTooLow = 0x89 => "Vehicle speed too low",
    ThrottleTooHigh = 0x8A => "Throttle/pedal too high",
    ThrottleTooLow = 0x8B => "Throttle/pedal too low",
    TransmissionNotInNeutral = 0x8C => "Transmission range not in neutral",
    TransmissionNotInGear = 0x8D => "Transmission range not in gear",
    BrakeSwitchNotClosed = 0x8F => "Brake switch not closed",
    ShifterNotInPark = 0x90 => "Shifter lever not in park",
    TorqueConverterClutchLocked = 0x91 => "Torque converter clutch locked",
    VoltageTooHigh = 0x92 => "Voltage too high",
    VoltageTooLow = 0x93 => "Voltage too low",
}

impl From<NegativeResponseCode> for u8 {
    fn from(nrc: NegativeResponseCode) -> Self {
        nrc.code()
    }
}

impl fmt::UpperHex for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.code(), f)
    }
}

impl fmt::Display for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(
            NegativeResponseCode::from(0x31),
            NegativeResponseCode::RequestOutOfRange
        );
        assert_eq!(
            NegativeResponseCode::from(0x78),
            NegativeResponseCode::ResponsePending
        );
        assert_eq!(NegativeResponseCode::SecurityAccessDenied.code(), 0x33);
    }

    #[test]
    fn test_unknown_code_round_trips() {
        let nrc = NegativeResponseCode::from(0xF3);
        assert_eq!(nrc, NegativeResponseCode::Unknown(0xF3));
        assert_eq!(u8::from(nrc), 0xF3);
        assert_eq!(nrc.to_string(), "Unknown negative response");
    }

    #[test]
    fn test_hex_formatting() {
        let nrc = NegativeResponseCode::ConditionsNotCorrect;
        assert_eq!(format!("0x{:02X}", nrc), "0x22");
        assert_eq!(format!("{}", nrc), "Conditions not correct");
    }
}
