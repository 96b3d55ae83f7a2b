//! Caller-supplied capability options and their validated forms.
//!
//! Callers pass a loosely-typed option map. Before any device call the map is
//! parsed into the typed parameters for the requested kind and range-checked,
//! so bridges only ever see well-formed input.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::CapabilityKind;

/// Upper bound on contacts returned by a single lookup.
pub const MAX_CONTACT_LIMIT: u32 = 500;
/// Upper bound on beeps per notification.
pub const MAX_BEEP_COUNT: u32 = 10;
/// Upper bound on vibration length.
pub const MAX_VIBRATE_MS: u64 = 5_000;

/// Raw option map for a capability request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityOptions(Map<String, Value>);

impl CapabilityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse and validate these options for `kind`.
    pub fn parse(&self, kind: CapabilityKind) -> Result<CapabilityParams, InvalidOptions> {
        let params = match kind {
            CapabilityKind::Location => CapabilityParams::Location(self.decode()?),
            CapabilityKind::Accelerometer => CapabilityParams::Accelerometer(self.decode()?),
            CapabilityKind::Camera => CapabilityParams::Camera(self.decode()?),
            CapabilityKind::FileRead => CapabilityParams::FileRead(self.decode()?),
            CapabilityKind::FileWrite => CapabilityParams::FileWrite(self.decode()?),
            CapabilityKind::Contacts => CapabilityParams::Contacts(self.decode()?),
            CapabilityKind::NetworkReachability => {
                CapabilityParams::NetworkReachability(self.decode()?)
            }
            CapabilityKind::Notification => CapabilityParams::Notification(self.decode()?),
        };
        params.validate()?;
        Ok(params)
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, InvalidOptions> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| InvalidOptions::new(e.to_string()))
    }
}

impl From<Map<String, Value>> for CapabilityOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Options that failed to parse or validate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidOptions {
    pub message: String,
}

impl InvalidOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validated, typed parameters for one capability request.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityParams {
    Location(LocationParams),
    Accelerometer(AccelerometerParams),
    Camera(CameraParams),
    FileRead(FileReadParams),
    FileWrite(FileWriteParams),
    Contacts(ContactsParams),
    NetworkReachability(ReachabilityParams),
    Notification(NotificationParams),
}

impl CapabilityParams {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            CapabilityParams::Location(_) => CapabilityKind::Location,
            CapabilityParams::Accelerometer(_) => CapabilityKind::Accelerometer,
            CapabilityParams::Camera(_) => CapabilityKind::Camera,
            CapabilityParams::FileRead(_) => CapabilityKind::FileRead,
            CapabilityParams::FileWrite(_) => CapabilityKind::FileWrite,
            CapabilityParams::Contacts(_) => CapabilityKind::Contacts,
            CapabilityParams::NetworkReachability(_) => CapabilityKind::NetworkReachability,
            CapabilityParams::Notification(_) => CapabilityKind::Notification,
        }
    }

    /// Per-request timeout override, if the caller supplied one.
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            CapabilityParams::Location(p) => p.timeout_ms,
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), InvalidOptions> {
        match self {
            CapabilityParams::Location(p) => {
                if p.timeout_ms == Some(0) {
                    return Err(InvalidOptions::new("timeout_ms must be greater than 0"));
                }
            }
            CapabilityParams::Accelerometer(_) => {}
            CapabilityParams::Camera(p) => {
                if p.quality > 100 {
                    return Err(InvalidOptions::new(format!(
                        "quality must be within 0..=100, got {}",
                        p.quality
                    )));
                }
            }
            CapabilityParams::FileRead(p) => require_path(&p.path)?,
            CapabilityParams::FileWrite(p) => require_path(&p.path)?,
            CapabilityParams::Contacts(p) => {
                if p.fields.is_empty() {
                    return Err(InvalidOptions::new("fields must name at least one contact field"));
                }
                if p.limit == 0 || p.limit > MAX_CONTACT_LIMIT {
                    return Err(InvalidOptions::new(format!(
                        "limit must be within 1..={}, got {}",
                        MAX_CONTACT_LIMIT, p.limit
                    )));
                }
            }
            CapabilityParams::NetworkReachability(p) => {
                if p.host.is_empty() {
                    return Err(InvalidOptions::new("host must not be empty"));
                }
                if p.host.len() > 253 || p.host.chars().any(char::is_whitespace) {
                    return Err(InvalidOptions::new(format!("invalid host name: {:?}", p.host)));
                }
            }
            CapabilityParams::Notification(NotificationParams::Beep { count }) => {
                if *count == 0 || *count > MAX_BEEP_COUNT {
                    return Err(InvalidOptions::new(format!(
                        "beep count must be within 1..={}, got {}",
                        MAX_BEEP_COUNT, count
                    )));
                }
            }
            CapabilityParams::Notification(NotificationParams::Vibrate { duration_ms }) => {
                if *duration_ms > MAX_VIBRATE_MS {
                    return Err(InvalidOptions::new(format!(
                        "duration_ms must be at most {}, got {}",
                        MAX_VIBRATE_MS, duration_ms
                    )));
                }
            }
        }
        Ok(())
    }
}

fn require_path(path: &str) -> Result<(), InvalidOptions> {
    if path.trim().is_empty() {
        return Err(InvalidOptions::new("path must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationParams {
    pub enable_high_accuracy: bool,
    /// Overrides the gateway's request timeout
    pub timeout_ms: Option<u64>,
    /// Accept a cached position no older than this
    pub maximum_age_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccelerometerParams {
    /// Sampling interval for watches. Clamped by the gateway.
    pub frequency_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraParams {
    /// JPEG quality, 0..=100
    pub quality: u32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self { quality: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileReadParams {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileWriteParams {
    pub path: String,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub append: bool,
}

/// Contact fields a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    DisplayName,
    PhoneNumbers,
    Emails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactsParams {
    pub fields: Vec<ContactField>,
    /// Substring filter; empty matches everything
    pub filter: String,
    pub multiple: bool,
    pub limit: u32,
}

impl Default for ContactsParams {
    fn default() -> Self {
        Self {
            fields: vec![
                ContactField::DisplayName,
                ContactField::PhoneNumbers,
                ContactField::Emails,
            ],
            filter: String::new(),
            multiple: true,
            limit: 5,
        }
    }
}

impl ContactsParams {
    /// Maximum number of contacts the caller accepts.
    pub fn max_results(&self) -> usize {
        if self.multiple {
            self.limit as usize
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReachabilityParams {
    /// Host whose reachability is queried
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum NotificationParams {
    Beep {
        #[serde(default = "default_beep_count")]
        count: u32,
    },
    Vibrate {
        /// 0 lets the platform pick its default length
        #[serde(default)]
        duration_ms: u64,
    },
}

fn default_beep_count() -> u32 {
    1
}
