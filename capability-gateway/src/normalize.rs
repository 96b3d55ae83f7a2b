//! Raw bridge error normalization.
//!
//! Every capability gets its own adapter with an explicit mapping table. A raw
//! error that no table recognizes becomes `ErrorCode::Unknown` with the raw
//! text preserved verbatim.

use capgate_common::{CapabilityKind, ErrorCode, Failure, RawError};

/// Geolocation position error codes.
const LOCATION_CODES: &[(i64, &str, ErrorCode)] = &[
    (1, "PERMISSION_DENIED", ErrorCode::PermissionDenied),
    (2, "POSITION_UNAVAILABLE", ErrorCode::Unavailable),
    (3, "TIMEOUT", ErrorCode::Timeout),
];

/// Exception names thrown by motion sensors.
const ACCELEROMETER_NAMES: &[(&str, ErrorCode)] = &[
    ("NotAllowedError", ErrorCode::PermissionDenied),
    ("SecurityError", ErrorCode::PermissionDenied),
    ("NotSupportedError", ErrorCode::Unavailable),
    ("NotReadableError", ErrorCode::Unavailable),
    ("TimeoutError", ErrorCode::Timeout),
];

const ACCELEROMETER_TEXT: &[(&str, ErrorCode)] = &[
    ("permission", ErrorCode::PermissionDenied),
    ("not supported", ErrorCode::Unavailable),
    ("unavailable", ErrorCode::Unavailable),
    ("timed out", ErrorCode::Timeout),
    ("timeout", ErrorCode::Timeout),
];

/// The camera reports failures as bare strings.
const CAMERA_TEXT: &[(&str, ErrorCode)] = &[
    ("permission", ErrorCode::PermissionDenied),
    ("no camera", ErrorCode::Unavailable),
    ("unavailable", ErrorCode::Unavailable),
    ("cancelled", ErrorCode::PermissionDenied),
];

/// File error codes.
const FILE_CODES: &[(i64, &str, ErrorCode)] = &[
    (1, "NOT_FOUND_ERR", ErrorCode::Unavailable),
    (2, "SECURITY_ERR", ErrorCode::PermissionDenied),
    (4, "NOT_READABLE_ERR", ErrorCode::PermissionDenied),
    (6, "NO_MODIFICATION_ALLOWED_ERR", ErrorCode::PermissionDenied),
];

/// Contact error codes.
const CONTACT_CODES: &[(i64, &str, ErrorCode)] = &[
    (2, "TIMEOUT_ERROR", ErrorCode::Timeout),
    (5, "NOT_SUPPORTED_ERROR", ErrorCode::Unavailable),
    (20, "PERMISSION_DENIED_ERROR", ErrorCode::PermissionDenied),
];

const NETWORK_TEXT: &[(&str, ErrorCode)] = &[
    ("permission", ErrorCode::PermissionDenied),
    ("timed out", ErrorCode::Timeout),
    ("timeout", ErrorCode::Timeout),
    ("offline", ErrorCode::Unavailable),
    ("unavailable", ErrorCode::Unavailable),
];

const NOTIFICATION_TEXT: &[(&str, ErrorCode)] = &[
    ("permission", ErrorCode::PermissionDenied),
    ("not supported", ErrorCode::Unavailable),
    ("no vibrator", ErrorCode::Unavailable),
];

/// Map a raw bridge error for `kind` onto the normalized taxonomy.
///
/// Deterministic: the same raw error always yields the same failure.
pub fn normalize_error(raw: &RawError, kind: CapabilityKind) -> Failure {
    let code = match kind {
        CapabilityKind::Location => by_code(LOCATION_CODES, raw),
        CapabilityKind::Accelerometer => {
            by_name(ACCELEROMETER_NAMES, raw).or_else(|| by_text(ACCELEROMETER_TEXT, raw))
        }
        CapabilityKind::Camera => by_text(CAMERA_TEXT, raw),
        CapabilityKind::FileRead | CapabilityKind::FileWrite => by_code(FILE_CODES, raw),
        CapabilityKind::Contacts => by_code(CONTACT_CODES, raw),
        CapabilityKind::NetworkReachability => by_text(NETWORK_TEXT, raw),
        CapabilityKind::Notification => by_text(NOTIFICATION_TEXT, raw),
    };

    match code {
        Some(code) => {
            let message = raw
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| default_message(kind, code));
            Failure::new(kind, code, message)
        }
        None => Failure::unknown(kind, raw.to_string()),
    }
}

/// Structured codes, numeric or symbolic.
fn by_code(table: &[(i64, &str, ErrorCode)], raw: &RawError) -> Option<ErrorCode> {
    if let Some(n) = raw.numeric_code() {
        return table.iter().find(|(c, _, _)| *c == n).map(|(_, _, code)| *code);
    }
    let symbol = match raw {
        RawError::Coded { .. } => raw.symbol()?,
        _ => return None,
    };
    table
        .iter()
        .find(|(_, name, _)| name.eq_ignore_ascii_case(symbol))
        .map(|(_, _, code)| *code)
}

/// Named exceptions.
fn by_name(table: &[(&str, ErrorCode)], raw: &RawError) -> Option<ErrorCode> {
    let name = match raw {
        RawError::Named { name, .. } => name,
        _ => return None,
    };
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Free-form text, from a bare string or a named exception's message.
fn by_text(table: &[(&str, ErrorCode)], raw: &RawError) -> Option<ErrorCode> {
    let text = match raw {
        RawError::Text(_) | RawError::Named { .. } => raw.message()?.to_lowercase(),
        _ => return None,
    };
    table
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, code)| *code)
}

fn default_message(kind: CapabilityKind, code: ErrorCode) -> String {
    match (kind, code) {
        (CapabilityKind::Location, ErrorCode::PermissionDenied) => {
            "User did not share geolocation data.".to_string()
        }
        (CapabilityKind::Location, ErrorCode::Unavailable) => {
            "Could not detect current position.".to_string()
        }
        (CapabilityKind::Location, ErrorCode::Timeout) => {
            "Retrieving position timed out.".to_string()
        }
        (_, ErrorCode::PermissionDenied) => format!("Access to {} was denied", kind),
        (_, ErrorCode::Unavailable) => format!("{} is not available on this device", kind),
        (_, ErrorCode::Timeout) => format!("{} did not respond in time", kind),
        _ => "Unknown error.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgate_common::RawCode;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(1, ErrorCode::PermissionDenied, "User did not share geolocation data.")]
    #[case(2, ErrorCode::Unavailable, "Could not detect current position.")]
    #[case(3, ErrorCode::Timeout, "Retrieving position timed out.")]
    fn test_location_codes(#[case] raw: i64, #[case] code: ErrorCode, #[case] message: &str) {
        let structured = RawError::Coded {
            code: RawCode::Number(raw),
            message: None,
        };
        let failure = normalize_error(&structured, CapabilityKind::Location);
        assert_eq!(failure.code, code);
        assert_eq!(failure.message, message);

        // Bare numbers map the same way
        let bare = normalize_error(&RawError::Number(raw), CapabilityKind::Location);
        assert_eq!(bare.code, code);
    }

    #[test]
    fn test_symbolic_location_code() {
        let raw = RawError::Coded {
            code: RawCode::Name("timeout".to_string()),
            message: Some("took too long".to_string()),
        };
        let failure = normalize_error(&raw, CapabilityKind::Location);
        assert_eq!(failure.code, ErrorCode::Timeout);
        assert_eq!(failure.message, "took too long");
    }

    #[rstest]
    #[case(RawError::named("NotAllowedError", "blocked"), ErrorCode::PermissionDenied)]
    #[case(RawError::named("NotReadableError", ""), ErrorCode::Unavailable)]
    #[case(RawError::named("TimeoutError", ""), ErrorCode::Timeout)]
    #[case(RawError::named("SensorError", "sensor unavailable"), ErrorCode::Unavailable)]
    #[case(RawError::text("Accelerometer not supported"), ErrorCode::Unavailable)]
    fn test_accelerometer_errors(#[case] raw: RawError, #[case] code: ErrorCode) {
        assert_eq!(normalize_error(&raw, CapabilityKind::Accelerometer).code, code);
    }

    #[rstest]
    #[case("Camera permission denied", ErrorCode::PermissionDenied)]
    #[case("No camera available", ErrorCode::Unavailable)]
    #[case("Camera cancelled.", ErrorCode::PermissionDenied)]
    fn test_camera_strings(#[case] text: &str, #[case] code: ErrorCode) {
        let failure = normalize_error(&RawError::text(text), CapabilityKind::Camera);
        assert_eq!(failure.code, code);
        assert_eq!(failure.message, text);
    }

    #[rstest]
    #[case(1, ErrorCode::Unavailable)]
    #[case(2, ErrorCode::PermissionDenied)]
    #[case(4, ErrorCode::PermissionDenied)]
    #[case(6, ErrorCode::PermissionDenied)]
    #[case(10, ErrorCode::Unknown)]
    fn test_file_codes(#[case] raw: i64, #[case] code: ErrorCode) {
        for kind in [CapabilityKind::FileRead, CapabilityKind::FileWrite] {
            assert_eq!(normalize_error(&RawError::Number(raw), kind).code, code);
        }
    }

    #[rstest]
    #[case(2, ErrorCode::Timeout)]
    #[case(5, ErrorCode::Unavailable)]
    #[case(20, ErrorCode::PermissionDenied)]
    #[case(0, ErrorCode::Unknown)]
    fn test_contact_codes(#[case] raw: i64, #[case] code: ErrorCode) {
        let failure = normalize_error(&RawError::coded(raw, "contacts failed"), CapabilityKind::Contacts);
        assert_eq!(failure.code, code);
    }

    #[test]
    fn test_network_and_notification_text() {
        assert_eq!(
            normalize_error(&RawError::text("request timed out"), CapabilityKind::NetworkReachability).code,
            ErrorCode::Timeout
        );
        assert_eq!(
            normalize_error(&RawError::text("No vibrator present"), CapabilityKind::Notification).code,
            ErrorCode::Unavailable
        );
    }

    #[test]
    fn test_unknown_preserves_raw_message() {
        let raw = RawError::text("Illegal Argument Exception");
        let failure = normalize_error(&raw, CapabilityKind::Camera);
        assert_eq!(failure.code, ErrorCode::Unknown);
        assert_eq!(failure.message, "Illegal Argument Exception");

        let raw = RawError::Other(json!({"weird": true}));
        let failure = normalize_error(&raw, CapabilityKind::Location);
        assert_eq!(failure.code, ErrorCode::Unknown);
        assert_eq!(failure.message, r#"{"weird":true}"#);
    }

    #[test]
    fn test_codes_ignored_for_text_capabilities() {
        // A bare number means nothing to the camera adapter
        let failure = normalize_error(&RawError::Number(1), CapabilityKind::Camera);
        assert_eq!(failure.code, ErrorCode::Unknown);
        assert_eq!(failure.message, "error code 1");
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let samples = [
            RawError::coded(1, "denied"),
            RawError::named("TimeoutError", "slow"),
            RawError::text("permission denied"),
            RawError::Number(5),
            RawError::Other(json!(null)),
        ];
        for kind in CapabilityKind::ALL {
            for raw in &samples {
                assert_eq!(normalize_error(raw, kind), normalize_error(raw, kind));
            }
        }
    }
}
