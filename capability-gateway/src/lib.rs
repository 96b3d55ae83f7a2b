//! Capability Gateway - uniform async access to device capabilities.
//!
//! Heterogeneous, possibly-absent, possibly-failing device capabilities are
//! put behind one contract: request a capability, get exactly one normalized
//! result (or a stream of them for watches).

pub mod bridge;
pub mod config;
pub mod decode;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod render;
pub mod watch;

pub use bridge::{CapabilityHandler, HandlerRegistry, SensorLease, SimulatedDevice};
pub use config::{Config, DemoStep, DeviceProfile, GatewaySettings};
pub use error::{Error, Result};
pub use gateway::{CapabilityGateway, PendingRequest};
pub use normalize::normalize_error;
pub use watch::{WatchHandle, WatchState, WatchStream};
