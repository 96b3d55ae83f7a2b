//! Raw bridge success decoding.
//!
//! Success values are no more consistent than errors: geolocation nests its
//! fields under `coords`, reachability arrives as either `{code}` or a bare
//! number, images come base64-encoded. Each capability gets one adapter that
//! turns the raw value into a typed payload, or an `Unknown` failure when the
//! value is malformed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use capgate_common::{
    Acceleration, CapabilityParams, CapabilityPayload, CapturedImage, Contact, Failure,
    FileContents, FileWritten, ImageFormat, NotificationAction, NotificationParams, Position,
    Reachability,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPosition {
    Wrapped { coords: Position },
    Flat(Position),
}

#[derive(Deserialize)]
struct RawAcceleration {
    x: f64,
    y: f64,
    z: f64,
    /// Milliseconds since the epoch
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawImage {
    Encoded(String),
    Wrapped { data: String },
}

/// Contact sub-fields come either as plain strings or as `{type, value}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Plain(String),
    Typed { value: String },
}

impl RawField {
    fn into_value(self) -> String {
        match self {
            RawField::Plain(v) | RawField::Typed { value: v } => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContact {
    #[serde(default, alias = "display_name")]
    display_name: Option<String>,
    #[serde(default, alias = "phone_numbers")]
    phone_numbers: Option<Vec<RawField>>,
    #[serde(default)]
    emails: Option<Vec<RawField>>,
}

impl From<RawContact> for Contact {
    fn from(raw: RawContact) -> Self {
        Contact {
            display_name: raw.display_name,
            phone_numbers: raw
                .phone_numbers
                .unwrap_or_default()
                .into_iter()
                .map(RawField::into_value)
                .collect(),
            emails: raw
                .emails
                .unwrap_or_default()
                .into_iter()
                .map(RawField::into_value)
                .collect(),
        }
    }
}

/// Reachability codes arrive structured or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReachability {
    Coded { code: i64 },
    Bare(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawWriteReceipt {
    Count(u64),
    Detailed { bytes_written: u64 },
}

/// Decode a raw success value for the request described by `params`.
pub fn decode_payload(params: &CapabilityParams, value: Value) -> Result<CapabilityPayload, Failure> {
    let kind = params.kind();
    let malformed = |e: String| Failure::unknown(kind, format!("Malformed {} payload: {}", kind, e));

    match params {
        CapabilityParams::Location(_) => {
            let position = match parse::<RawPosition>(value).map_err(malformed)? {
                RawPosition::Wrapped { coords } => coords,
                RawPosition::Flat(position) => position,
            };
            Ok(CapabilityPayload::Location(position))
        }
        CapabilityParams::Accelerometer(_) => {
            let raw: RawAcceleration = parse(value).map_err(malformed)?;
            Ok(CapabilityPayload::Acceleration(Acceleration {
                x: raw.x,
                y: raw.y,
                z: raw.z,
                timestamp: raw.timestamp.and_then(millis_to_utc),
            }))
        }
        CapabilityParams::Camera(_) => {
            let encoded = match parse::<RawImage>(value).map_err(malformed)? {
                RawImage::Encoded(s) | RawImage::Wrapped { data: s } => s,
            };
            let data = BASE64
                .decode(encoded.trim())
                .map_err(|e| malformed(e.to_string()))?;
            Ok(CapabilityPayload::Image(CapturedImage {
                format: ImageFormat::Jpeg,
                data,
            }))
        }
        CapabilityParams::FileRead(p) => {
            let contents: String = parse(value).map_err(malformed)?;
            Ok(CapabilityPayload::FileContents(FileContents {
                path: p.path.clone(),
                contents,
            }))
        }
        CapabilityParams::FileWrite(p) => {
            // Some bridges acknowledge a write with nothing at all
            let bytes_written = match value {
                Value::Null => p.contents.len() as u64,
                other => match parse::<RawWriteReceipt>(other).map_err(malformed)? {
                    RawWriteReceipt::Count(n) | RawWriteReceipt::Detailed { bytes_written: n } => n,
                },
            };
            Ok(CapabilityPayload::FileWritten(FileWritten {
                path: p.path.clone(),
                bytes_written,
            }))
        }
        CapabilityParams::Contacts(p) => {
            let raw: Vec<RawContact> = parse(value).map_err(malformed)?;
            let contacts = raw
                .into_iter()
                .take(p.max_results())
                .map(Contact::from)
                .collect();
            Ok(CapabilityPayload::Contacts(contacts))
        }
        CapabilityParams::NetworkReachability(_) => {
            let code = match parse::<RawReachability>(value).map_err(malformed)? {
                RawReachability::Coded { code } | RawReachability::Bare(code) => code,
            };
            Reachability::from_code(code)
                .map(CapabilityPayload::Reachability)
                .ok_or_else(|| Failure::unknown(kind, format!("Unrecognized reachability code {}", code)))
        }
        CapabilityParams::Notification(action) => {
            let action = match action {
                NotificationParams::Beep { .. } => NotificationAction::Beep,
                NotificationParams::Vibrate { .. } => NotificationAction::Vibrate,
            };
            Ok(CapabilityPayload::Notification(action))
        }
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgate_common::{CapabilityKind, CapabilityOptions, ErrorCode};
    use serde_json::json;

    fn params(kind: CapabilityKind, options: CapabilityOptions) -> CapabilityParams {
        options.parse(kind).unwrap()
    }

    #[test]
    fn test_location_nested_and_flat() {
        let p = params(CapabilityKind::Location, CapabilityOptions::new());
        let expected = CapabilityPayload::Location(Position {
            latitude: 37.0,
            longitude: -122.0,
            accuracy: 10.0,
            altitude: None,
        });

        let nested = json!({"coords": {"latitude": 37.0, "longitude": -122.0, "accuracy": 10}});
        assert_eq!(decode_payload(&p, nested).unwrap(), expected);

        let flat = json!({"latitude": 37.0, "longitude": -122.0, "accuracy": 10});
        assert_eq!(decode_payload(&p, flat).unwrap(), expected);
    }

    #[test]
    fn test_reachability_structured_or_bare() {
        let p = params(
            CapabilityKind::NetworkReachability,
            CapabilityOptions::new().with("host", "example.com"),
        );
        assert_eq!(
            decode_payload(&p, json!({"code": 2})).unwrap(),
            CapabilityPayload::Reachability(Reachability::Wifi)
        );
        assert_eq!(
            decode_payload(&p, json!(1)).unwrap(),
            CapabilityPayload::Reachability(Reachability::CarrierData)
        );

        let failure = decode_payload(&p, json!(9)).unwrap_err();
        assert_eq!(failure.code, ErrorCode::Unknown);
        assert!(failure.message.contains('9'));
    }

    #[test]
    fn test_camera_base64() {
        let p = params(CapabilityKind::Camera, CapabilityOptions::new());
        let encoded = BASE64.encode([0xFFu8, 0xD8, 0xFF]);

        match decode_payload(&p, json!(encoded)).unwrap() {
            CapabilityPayload::Image(image) => assert_eq!(image.data, vec![0xFF, 0xD8, 0xFF]),
            other => panic!("unexpected payload: {:?}", other),
        }

        let failure = decode_payload(&p, json!("not base64!!")).unwrap_err();
        assert_eq!(failure.code, ErrorCode::Unknown);
    }

    #[test]
    fn test_contacts_field_shapes_and_limit() {
        let p = params(
            CapabilityKind::Contacts,
            CapabilityOptions::new().with("limit", 2),
        );
        let raw = json!([
            {"displayName": "Ada", "phoneNumbers": [{"type": "mobile", "value": "555-1"}]},
            {"displayName": "Alan", "emails": ["alan@example.com"]},
            {"displayName": "Grace"}
        ]);

        match decode_payload(&p, raw).unwrap() {
            CapabilityPayload::Contacts(contacts) => {
                assert_eq!(contacts.len(), 2);
                assert_eq!(contacts[0].phone_numbers, vec!["555-1".to_string()]);
                assert_eq!(contacts[1].emails, vec!["alan@example.com".to_string()]);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_file_write_receipts() {
        let p = params(
            CapabilityKind::FileWrite,
            CapabilityOptions::new().with("path", "foo.txt").with("contents", "abc"),
        );
        let written = |v| match decode_payload(&p, v).unwrap() {
            CapabilityPayload::FileWritten(w) => w.bytes_written,
            other => panic!("unexpected payload: {:?}", other),
        };
        assert_eq!(written(Value::Null), 3);
        assert_eq!(written(json!(7)), 7);
        assert_eq!(written(json!({"bytes_written": 9})), 9);
    }

    #[test]
    fn test_malformed_acceleration() {
        let p = params(CapabilityKind::Accelerometer, CapabilityOptions::new());
        let failure = decode_payload(&p, json!({"x": 1.0})).unwrap_err();
        assert_eq!(failure.code, ErrorCode::Unknown);
        assert!(failure.message.starts_with("Malformed accelerometer payload"));
    }
}
