//! Readable text for results, so no outcome is ever shown as a blank.

use capgate_common::{
    CapabilityKind, CapabilityPayload, CapabilityResult, Failure, NotificationAction,
};

/// Round to three decimals for display.
pub fn round_number(num: f64) -> f64 {
    (num * 1000.0).round() / 1000.0
}

/// Describe a result for an observer.
pub fn describe(result: &CapabilityResult) -> String {
    match result {
        CapabilityResult::Success(payload) => describe_payload(payload),
        CapabilityResult::Failure(failure) => describe_failure(failure),
    }
}

fn describe_payload(payload: &CapabilityPayload) -> String {
    match payload {
        CapabilityPayload::Location(p) => format!(
            "Latitude: {}\nLongitude: {}\nAccuracy: {}m",
            p.latitude, p.longitude, p.accuracy
        ),
        CapabilityPayload::Acceleration(a) => format!(
            "x: {}  y: {}  z: {}",
            round_number(a.x),
            round_number(a.y),
            round_number(a.z)
        ),
        CapabilityPayload::Image(image) => {
            format!("Captured {} byte {:?} image", image.data.len(), image.format)
        }
        CapabilityPayload::FileContents(f) => format!("{}: {}", f.path, f.contents),
        CapabilityPayload::FileWritten(f) => {
            format!("Wrote {} bytes to {}", f.bytes_written, f.path)
        }
        CapabilityPayload::Contacts(contacts) => {
            let mut text = format!("{} contacts returned.", contacts.len());
            if let Some(name) = contacts.get(2).and_then(|c| c.display_name.as_deref()) {
                text.push_str(&format!(" Third contact is {}", name));
            }
            text
        }
        CapabilityPayload::Reachability(r) => format!("Connection type: {}", r),
        CapabilityPayload::Notification(NotificationAction::Beep) => "Beep sent".to_string(),
        CapabilityPayload::Notification(NotificationAction::Vibrate) => {
            "Vibration sent".to_string()
        }
    }
}

fn describe_failure(failure: &Failure) -> String {
    match failure.kind {
        CapabilityKind::Location => {
            format!("Failed to get location: {}", failure.message)
        }
        _ => format!("{} failed ({}): {}", failure.kind, failure.code, failure.message),
    }
}
