//! Simulated device bridge.
//!
//! Stands in for a real device: answers every capability from the configured
//! `DeviceProfile`, and speaks each capability's native raw dialect (nested
//! geolocation coords, named sensor exceptions, bare camera strings, file and
//! contact error codes, inconsistently shaped reachability codes).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use capgate_common::{
    AvailabilityState, CapabilityKind, CapabilityParams, ContactField, ContactsParams, RawError,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use super::{CapabilityHandler, SensorLease};
use crate::config::DeviceProfile;

struct DeviceState {
    profile: DeviceProfile,
    files: Mutex<HashMap<String, String>>,
    /// Open sensor subscriptions and the readings taken on each
    sensors: Mutex<HashMap<SensorLease, u64>>,
    next_lease: AtomicU64,
    reachability_queries: AtomicU64,
}

/// A simulated device exposing one handler per capability kind.
#[derive(Clone)]
pub struct SimulatedDevice {
    state: Arc<DeviceState>,
}

impl SimulatedDevice {
    pub fn new(profile: DeviceProfile) -> Self {
        let files = profile
            .files
            .iter()
            .map(|f| (f.path.clone(), f.contents.clone()))
            .collect();
        Self {
            state: Arc::new(DeviceState {
                profile,
                files: Mutex::new(files),
                sensors: Mutex::new(HashMap::new()),
                next_lease: AtomicU64::new(1),
                reachability_queries: AtomicU64::new(0),
            }),
        }
    }

    /// Handlers for every capability kind.
    pub fn handlers(&self) -> Vec<Arc<dyn CapabilityHandler>> {
        CapabilityKind::ALL
            .into_iter()
            .map(|kind| {
                Arc::new(SimulatedHandler {
                    kind,
                    device: self.state.clone(),
                }) as Arc<dyn CapabilityHandler>
            })
            .collect()
    }

    /// Number of sensor subscriptions currently open.
    pub async fn open_sensors(&self) -> usize {
        self.state.sensors.lock().await.len()
    }

    /// Current contents of a stored file.
    pub async fn file(&self, path: &str) -> Option<String> {
        self.state.files.lock().await.get(path).cloned()
    }
}

struct SimulatedHandler {
    kind: CapabilityKind,
    device: Arc<DeviceState>,
}

impl SimulatedHandler {
    fn is_absent(&self) -> bool {
        self.device.profile.absent.contains(&self.kind)
    }

    fn is_denied(&self) -> bool {
        self.device.profile.denied.contains(&self.kind)
    }

    async fn settle(&self) {
        if self.device.profile.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.device.profile.latency_ms)).await;
        }
    }

    /// Gate every device call on presence and permission.
    fn admit(&self) -> Result<(), RawError> {
        if self.is_absent() {
            return Err(absent_error(self.kind));
        }
        if self.is_denied() {
            return Err(denied_error(self.kind));
        }
        Ok(())
    }

    fn contacts(&self, params: &ContactsParams) -> Value {
        let filter = params.filter.to_lowercase();
        let matches: Vec<Value> = self
            .device
            .profile
            .contacts
            .iter()
            .filter(|c| {
                filter.is_empty()
                    || c.display_name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&filter))
            })
            .take(params.max_results())
            .map(|c| {
                let mut entry = Map::new();
                for field in &params.fields {
                    match field {
                        ContactField::DisplayName => {
                            entry.insert("displayName".into(), json!(c.display_name));
                        }
                        ContactField::PhoneNumbers => {
                            let numbers: Vec<Value> = c
                                .phone_numbers
                                .iter()
                                .map(|n| json!({"type": "mobile", "value": n}))
                                .collect();
                            entry.insert("phoneNumbers".into(), Value::Array(numbers));
                        }
                        ContactField::Emails => {
                            entry.insert("emails".into(), json!(c.emails));
                        }
                    }
                }
                Value::Object(entry)
            })
            .collect();
        Value::Array(matches)
    }
}

#[async_trait]
impl CapabilityHandler for SimulatedHandler {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    fn availability(&self) -> AvailabilityState {
        if self.is_absent() {
            AvailabilityState::Unavailable
        } else {
            AvailabilityState::Available
        }
    }

    async fn invoke(&self, params: &CapabilityParams) -> Result<Value, RawError> {
        self.settle().await;
        self.admit()?;

        match params {
            CapabilityParams::Location(_) => {
                let p = &self.device.profile.location;
                Ok(json!({
                    "coords": {
                        "latitude": p.latitude,
                        "longitude": p.longitude,
                        "accuracy": p.accuracy,
                        "altitude": p.altitude,
                    },
                    "timestamp": Utc::now().timestamp_millis(),
                }))
            }
            CapabilityParams::Accelerometer(_) => Ok(reading(0)),
            CapabilityParams::Camera(p) => Ok(json!(BASE64.encode(fake_jpeg(p.quality)))),
            CapabilityParams::FileRead(p) => self
                .device
                .files
                .lock()
                .await
                .get(&p.path)
                .map(|contents| json!(contents))
                .ok_or_else(|| RawError::coded(1, "NOT_FOUND_ERR")),
            CapabilityParams::FileWrite(p) => {
                let mut files = self.device.files.lock().await;
                let entry = files.entry(p.path.clone()).or_default();
                if !p.append {
                    entry.clear();
                }
                entry.push_str(&p.contents);
                Ok(json!({ "bytes_written": p.contents.len() }))
            }
            CapabilityParams::Contacts(p) => Ok(self.contacts(p)),
            CapabilityParams::NetworkReachability(_) => {
                let code = self.device.profile.reachability.code();
                // The provider never settled on one shape
                let n = self.device.reachability_queries.fetch_add(1, Ordering::Relaxed);
                if n % 2 == 0 {
                    Ok(json!({ "code": code }))
                } else {
                    Ok(json!(code))
                }
            }
            CapabilityParams::Notification(_) => Ok(Value::Null),
        }
    }

    async fn open_sensor(&self, _params: &CapabilityParams) -> Result<SensorLease, RawError> {
        self.settle().await;
        self.admit()?;
        if !self.kind.supports_watch() {
            return Err(RawError::named("NotSupportedError", "no continuous readings"));
        }
        let lease = SensorLease(self.device.next_lease.fetch_add(1, Ordering::Relaxed));
        self.device.sensors.lock().await.insert(lease, 0);
        Ok(lease)
    }

    async fn sample(&self, lease: SensorLease) -> Result<Value, RawError> {
        let mut sensors = self.device.sensors.lock().await;
        match sensors.get_mut(&lease) {
            Some(taken) => {
                *taken += 1;
                Ok(reading(*taken))
            }
            None => Err(RawError::named(
                "InvalidStateError",
                format!("{} is not open", lease),
            )),
        }
    }

    async fn close_sensor(&self, lease: SensorLease) {
        self.device.sensors.lock().await.remove(&lease);
    }
}

/// Raw error a missing device would raise, in the capability's own dialect.
fn absent_error(kind: CapabilityKind) -> RawError {
    match kind {
        CapabilityKind::Location => RawError::coded(2, "Position unavailable"),
        CapabilityKind::Accelerometer => RawError::named("NotSupportedError", "No motion sensor"),
        CapabilityKind::Camera => RawError::text("No camera available"),
        CapabilityKind::FileRead | CapabilityKind::FileWrite => RawError::coded(1, "NOT_FOUND_ERR"),
        CapabilityKind::Contacts => RawError::coded(5, "NOT_SUPPORTED_ERROR"),
        CapabilityKind::NetworkReachability => RawError::text("network status unavailable"),
        CapabilityKind::Notification => RawError::text("No vibrator present"),
    }
}

/// Raw error a user refusal produces, in the capability's own dialect.
fn denied_error(kind: CapabilityKind) -> RawError {
    match kind {
        CapabilityKind::Location => RawError::coded(1, "User denied Geolocation"),
        CapabilityKind::Accelerometer => {
            RawError::named("NotAllowedError", "Motion sensor access denied")
        }
        CapabilityKind::Camera => RawError::text("Camera permission denied"),
        CapabilityKind::FileRead | CapabilityKind::FileWrite => RawError::coded(2, "SECURITY_ERR"),
        CapabilityKind::Contacts => RawError::coded(20, "PERMISSION_DENIED_ERROR"),
        CapabilityKind::NetworkReachability | CapabilityKind::Notification => {
            RawError::text("permission denied")
        }
    }
}

fn reading(tick: u64) -> Value {
    let t = tick as f64 * 0.5;
    json!({
        "x": t.sin() * 0.3,
        "y": t.cos() * 0.3,
        "z": 9.81,
        "timestamp": Utc::now().timestamp_millis(),
    })
}

/// A minimal JPEG-framed buffer; the quality byte makes captures distinguishable.
fn fake_jpeg(quality: u32) -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, quality.min(100) as u8, 0xFF, 0xD9]
}
