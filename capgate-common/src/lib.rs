//! Capability Gateway Common Types
//!
//! Shared types used by the gateway, its bridges and its observers.

pub mod capability;
pub mod options;
pub mod raw;
pub mod request;
pub mod result;

pub use capability::{AvailabilityState, CapabilityKind};
pub use options::{
    AccelerometerParams, CameraParams, CapabilityOptions, CapabilityParams, ContactField,
    ContactsParams, FileReadParams, FileWriteParams, InvalidOptions, LocationParams,
    NotificationParams, ReachabilityParams,
};
pub use raw::{RawCode, RawError};
pub use request::CapabilityRequest;
pub use result::{
    Acceleration, CapabilityPayload, CapabilityResult, CapturedImage, Contact, ErrorCode,
    Failure, FileContents, FileWritten, ImageFormat, NotificationAction, Position, Reachability,
};
