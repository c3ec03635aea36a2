//! UDS service frames
//!
//! A request is `[sid, data..]`. A positive reply starts with `sid + 0x40`,
//! a negative one with `7F <sid> <nrc>`.

use crate::error::{Result, UdsError};
use crate::nrc::NegativeResponseCode;

/// Service IDs used by the client
pub mod service_id {
    pub const DIAGNOSTIC_SESSION_CONTROL: u8 = 0x10;
    pub const READ_DATA_BY_ID: u8 = 0x22;
    pub const WRITE_DATA_BY_ID: u8 = 0x2E;
    pub const ROUTINE_CONTROL: u8 = 0x31;
    pub const TESTER_PRESENT: u8 = 0x3E;
    pub const NEGATIVE_RESPONSE: u8 = 0x7F;
}

/// DiagnosticSessionControl (0x10) session types
pub mod session_type {
    pub const DEFAULT: u8 = 0x01;
    pub const PROGRAMMING: u8 = 0x02;
    pub const EXTENDED: u8 = 0x03;
}

/// RoutineControl (0x31) sub-functions
pub mod routine_sub_function {
    pub const START_ROUTINE: u8 = 0x01;
    pub const STOP_ROUTINE: u8 = 0x02;
    pub const REQUEST_ROUTINE_RESULTS: u8 = 0x03;
}

const POSITIVE_OFFSET: u8 = 0x40;

pub fn build_request(service_id: u8, data: &[u8]) -> Vec<u8> {
    let mut request = Vec::with_capacity(data.len() + 1);
    request.push(service_id);
    request.extend_from_slice(data);
    request
}

pub fn positive_response(service_id: u8) -> u8 {
    service_id.wrapping_add(POSITIVE_OFFSET)
}

pub fn is_negative_response(response: &[u8]) -> bool {
    response.first() == Some(&service_id::NEGATIVE_RESPONSE)
}

/// `(service, nrc)` of a negative response
pub fn parse_negative(response: &[u8]) -> Result<(u8, NegativeResponseCode)> {
    match response {
        [service_id::NEGATIVE_RESPONSE, service, nrc, ..] => {
            Ok((*service, NegativeResponseCode::from(*nrc)))
        }
        _ => Err(UdsError::InvalidResponse(
            "Negative response too short".to_string(),
        )),
    }
}

/// Error for a negative response, `None` otherwise
pub fn negative_error(response: &[u8]) -> Option<UdsError> {
    if !is_negative_response(response) {
        return None;
    }
    Some(match parse_negative(response) {
        Ok((service_id, nrc)) => UdsError::NegativeResponse { service_id, nrc },
        Err(e) => e,
    })
}

/// Require a positive response to `service_id`
pub fn check_positive(service_id: u8, response: &[u8]) -> Result<()> {
    let Some(&first) = response.first() else {
        return Err(UdsError::InvalidResponse("Empty UDS response".to_string()));
    };
    if let Some(err) = negative_error(response) {
        return Err(err);
    }
    let expected = positive_response(service_id);
    if first != expected {
        return Err(UdsError::UnexpectedResponse {
            expected,
            actual: first,
        });
    }
    Ok(())
}

/// Drop leading `7F xx 78` (response pending) frames
///
/// The adapter collects the pending notice and the final answer in one
/// exchange, so they arrive concatenated.
pub fn skip_response_pending(mut response: Vec<u8>) -> Vec<u8> {
    while response.len() > 3
        && response[0] == service_id::NEGATIVE_RESPONSE
        && NegativeResponseCode::from(response[2]) == NegativeResponseCode::ResponsePending
    {
        response.drain(..3);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_request() {
        assert_eq!(build_request(0x22, &[0xF1, 0x90]), vec![0x22, 0xF1, 0x90]);
        assert_eq!(build_request(0x3E, &[]), vec![0x3E]);
    }

    #[test]
    fn test_positive_response() {
        assert_eq!(positive_response(service_id::READ_DATA_BY_ID), 0x62);
        assert_eq!(positive_response(service_id::ROUTINE_CONTROL), 0x71);
        assert_eq!(positive_response(service_id::TESTER_PRESENT), 0x7E);
    }

    #[test]
    fn test_parse_negative() {
        let response = [0x7F, 0x22, 0x31];
        assert!(is_negative_response(&response));
        assert_eq!(
            parse_negative(&response).unwrap(),
            (0x22, NegativeResponseCode::RequestOutOfRange)
        );
        assert!(parse_negative(&[0x7F, 0x22]).is_err());
    }

    #[test]
    fn test_check_positive() {
        assert_eq!(check_positive(0x22, &[0x62, 0xF1, 0x90]), Ok(()));
        assert_eq!(
            check_positive(0x22, &[]),
            Err(UdsError::InvalidResponse("Empty UDS response".to_string()))
        );
        assert_eq!(
            check_positive(0x22, &[0x7F, 0x22, 0x33]),
            Err(UdsError::NegativeResponse {
                service_id: 0x22,
                nrc: NegativeResponseCode::SecurityAccessDenied,
            })
        );
        assert_eq!(
            check_positive(0x22, &[0x6E, 0xF1, 0x90]),
            Err(UdsError::UnexpectedResponse {
                expected: 0x62,
                actual: 0x6E,
            })
        );
    }

    #[test]
    fn test_skip_response_pending() {
        let response = vec![0x7F, 0x31, 0x78, 0x7F, 0x31, 0x78, 0x71, 0x01, 0xFF, 0x00];
        assert_eq!(
            skip_response_pending(response),
            vec![0x71, 0x01, 0xFF, 0x00]
        );
        // A lone pending notice is left for the caller to report
        assert_eq!(skip_response_pending(vec![0x7F, 0x31, 0x78]), vec![0x7F, 0x31, 0x78]);
        assert_eq!(skip_response_pending(vec![0x7F, 0x22, 0x31]), vec![0x7F, 0x22, 0x31]);
    }
}
