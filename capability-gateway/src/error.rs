//! Error types for the capability gateway.
//!
//! Device-level problems never surface here: they are delivered to observers
//! as `Failure` results. This enum covers the gateway's own setup.

use capgate_common::CapabilityKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Handler already registered for capability: {0}")]
    DuplicateHandler(CapabilityKind),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
