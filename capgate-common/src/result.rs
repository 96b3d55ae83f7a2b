//! Results delivered to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityKind;

/// Normalized, capability-agnostic error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// User or environment declined access
    PermissionDenied,
    /// Capability absent or device not present
    Unavailable,
    /// Capability did not respond in time
    Timeout,
    /// Caller-supplied options were malformed
    ValidationError,
    /// No handler registered for the requested kind
    UnsupportedCapability,
    /// Raw error did not map to any recognized code
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::PermissionDenied => write!(f, "permission_denied"),
            ErrorCode::Unavailable => write!(f, "unavailable"),
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::ValidationError => write!(f, "validation_error"),
            ErrorCode::UnsupportedCapability => write!(f, "unsupported_capability"),
            ErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// A normalized failure for one request or watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} failed ({code}): {message}")]
pub struct Failure {
    pub kind: CapabilityKind,
    pub code: ErrorCode,
    pub message: String,
}

impl Failure {
    pub fn new(kind: CapabilityKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(kind: CapabilityKind) -> Self {
        Self::new(
            kind,
            ErrorCode::Unavailable,
            format!("Device or environment can not provide {}", kind),
        )
    }

    pub fn unsupported(kind: CapabilityKind) -> Self {
        Self::new(
            kind,
            ErrorCode::UnsupportedCapability,
            format!("No handler registered for {}", kind),
        )
    }

    pub fn validation(kind: CapabilityKind, message: impl Into<String>) -> Self {
        Self::new(kind, ErrorCode::ValidationError, message)
    }

    pub fn timeout(kind: CapabilityKind, after_ms: u64) -> Self {
        Self::new(
            kind,
            ErrorCode::Timeout,
            format!("No response from {} within {}ms", kind, after_ms),
        )
    }

    pub fn unknown(kind: CapabilityKind, message: impl Into<String>) -> Self {
        Self::new(kind, ErrorCode::Unknown, message)
    }
}

/// Geographic position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
}

/// One accelerometer reading in m/s².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContents {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWritten {
    pub path: String,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

/// How the device can reach the queried host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    NotReachable,
    CarrierData,
    Wifi,
}

impl Reachability {
    /// Map the bridge's network status code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Reachability::NotReachable),
            1 => Some(Reachability::CarrierData),
            2 => Some(Reachability::Wifi),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Reachability::NotReachable => 0,
            Reachability::CarrierData => 1,
            Reachability::Wifi => 2,
        }
    }
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reachability::NotReachable => write!(f, "No network connection"),
            Reachability::CarrierData => write!(f, "Carrier data connection"),
            Reachability::Wifi => write!(f, "WiFi connection"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Beep,
    Vibrate,
}

/// Capability-specific success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CapabilityPayload {
    Location(Position),
    Acceleration(Acceleration),
    Image(CapturedImage),
    FileContents(FileContents),
    FileWritten(FileWritten),
    Contacts(Vec<Contact>),
    Reachability(Reachability),
    Notification(NotificationAction),
}

/// Outcome of a request, or one item of a watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityResult {
    Success(CapabilityPayload),
    Failure(Failure),
}

impl CapabilityResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CapabilityResult::Success(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CapabilityResult::Failure(f) => Some(f),
            CapabilityResult::Success(_) => None,
        }
    }

    pub fn payload(&self) -> Option<&CapabilityPayload> {
        match self {
            CapabilityResult::Success(p) => Some(p),
            CapabilityResult::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> Result<CapabilityPayload, Failure> {
        self.into()
    }
}

impl From<Result<CapabilityPayload, Failure>> for CapabilityResult {
    fn from(result: Result<CapabilityPayload, Failure>) -> Self {
        match result {
            Ok(payload) => CapabilityResult::Success(payload),
            Err(failure) => CapabilityResult::Failure(failure),
        }
    }
}

impl From<CapabilityResult> for Result<CapabilityPayload, Failure> {
    fn from(result: CapabilityResult) -> Self {
        match result {
            CapabilityResult::Success(payload) => Ok(payload),
            CapabilityResult::Failure(failure) => Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let failure = Failure::new(
            CapabilityKind::Camera,
            ErrorCode::PermissionDenied,
            "Camera permission denied",
        );
        assert_eq!(
            failure.to_string(),
            "camera failed (permission_denied): Camera permission denied"
        );
    }

    #[test]
    fn test_reachability_codes() {
        for r in [
            Reachability::NotReachable,
            Reachability::CarrierData,
            Reachability::Wifi,
        ] {
            assert_eq!(Reachability::from_code(r.code()), Some(r));
        }
        assert_eq!(Reachability::from_code(7), None);
        assert_eq!(Reachability::Wifi.to_string(), "WiFi connection");
    }

    #[test]
    fn test_payload_serialization_is_tagged() {
        let payload = CapabilityPayload::Reachability(Reachability::CarrierData);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "reachability");
        assert_eq!(json["data"], "carrier_data");
    }

    #[test]
    fn test_into_result() {
        let ok = CapabilityResult::Success(CapabilityPayload::Notification(NotificationAction::Beep));
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());

        let err = CapabilityResult::Failure(Failure::unsupported(CapabilityKind::Contacts));
        assert_eq!(err.failure().map(|f| f.code), Some(ErrorCode::UnsupportedCapability));
        assert!(err.into_result().is_err());
    }
}
