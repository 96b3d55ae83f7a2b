//! Device bridge abstraction layer.
//!
//! This module defines the `CapabilityHandler` trait that puts each device
//! capability (geolocation provider, motion sensor, camera, ...) behind a
//! common interface. Handlers speak the bridge's raw dialect: successes are
//! untyped JSON values and errors are `RawError`s in whatever shape the
//! device produced. The gateway owns decoding and normalization.

mod registry;
mod simulated;

pub use registry::HandlerRegistry;
pub use simulated::SimulatedDevice;

use async_trait::async_trait;
use capgate_common::{AvailabilityState, CapabilityKind, CapabilityParams, RawError};
use serde_json::Value;

/// Token for an open sensor subscription on the bridge side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorLease(pub u64);

impl std::fmt::Display for SensorLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lease-{}", self.0)
    }
}

/// Bridge entry point for one capability kind.
///
/// Continuous delivery is optional: only kinds whose
/// `CapabilityKind::supports_watch` is true are ever asked to open a sensor.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// The capability this handler serves.
    fn kind(&self) -> CapabilityKind;

    /// Cheap, synchronous presence probe. Must not touch the device.
    fn availability(&self) -> AvailabilityState {
        AvailabilityState::Unknown
    }

    /// Perform a single request.
    async fn invoke(&self, params: &CapabilityParams) -> Result<Value, RawError>;

    /// Subscribe to continuous readings.
    async fn open_sensor(&self, _params: &CapabilityParams) -> Result<SensorLease, RawError> {
        Err(RawError::text("continuous delivery not supported"))
    }

    /// Take the next reading from an open subscription.
    async fn sample(&self, _lease: SensorLease) -> Result<Value, RawError> {
        Err(RawError::text("continuous delivery not supported"))
    }

    /// Release an open subscription.
    async fn close_sensor(&self, _lease: SensorLease) {}
}
