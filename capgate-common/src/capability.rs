//! Capability kinds and availability state.

use serde::{Deserialize, Serialize};

/// Device capabilities reachable through the bridge.
///
/// These are logical capability kinds, not specific devices. Each bridge
/// registers one handler per kind it can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Current geographic position
    Location,
    /// Motion sensor readings, one-shot or continuous
    Accelerometer,
    /// Still image capture
    Camera,
    /// Read a text file from device storage
    FileRead,
    /// Write a text file to device storage
    FileWrite,
    /// Address book lookup
    Contacts,
    /// Network reachability classification for a host
    NetworkReachability,
    /// Beep or vibrate
    Notification,
}

impl CapabilityKind {
    /// All capability variants for iteration.
    pub const ALL: [CapabilityKind; 8] = [
        CapabilityKind::Location,
        CapabilityKind::Accelerometer,
        CapabilityKind::Camera,
        CapabilityKind::FileRead,
        CapabilityKind::FileWrite,
        CapabilityKind::Contacts,
        CapabilityKind::NetworkReachability,
        CapabilityKind::Notification,
    ];

    /// Whether this kind can deliver a continuous stream of readings.
    pub fn supports_watch(&self) -> bool {
        matches!(self, CapabilityKind::Accelerometer)
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Location => write!(f, "location"),
            CapabilityKind::Accelerometer => write!(f, "accelerometer"),
            CapabilityKind::Camera => write!(f, "camera"),
            CapabilityKind::FileRead => write!(f, "file_read"),
            CapabilityKind::FileWrite => write!(f, "file_write"),
            CapabilityKind::Contacts => write!(f, "contacts"),
            CapabilityKind::NetworkReachability => write!(f, "network_reachability"),
            CapabilityKind::Notification => write!(f, "notification"),
        }
    }
}

/// Whether a capability is present in the current environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityState {
    Available,
    Unavailable,
    /// Not known until a request has been attempted
    Unknown,
}

impl AvailabilityState {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AvailabilityState::Unavailable)
    }
}
