//! Capability requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::capability::CapabilityKind;
use crate::options::{CapabilityOptions, CapabilityParams, InvalidOptions};

/// A single invocation of a capability.
///
/// Created per call and never mutated after it is issued, so the accessors
/// are the only way to read it.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityRequest {
    id: Uuid,
    kind: CapabilityKind,
    options: CapabilityOptions,
    issued_at: DateTime<Utc>,
}

impl CapabilityRequest {
    pub fn new(kind: CapabilityKind, options: CapabilityOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            options,
            issued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn options(&self) -> &CapabilityOptions {
        &self.options
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Validate the options against this request's kind.
    pub fn params(&self) -> Result<CapabilityParams, InvalidOptions> {
        self.options.parse(self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_request_gets_its_own_id() {
        let a = CapabilityRequest::new(CapabilityKind::Location, CapabilityOptions::new());
        let b = CapabilityRequest::new(CapabilityKind::Location, CapabilityOptions::new());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), CapabilityKind::Location);
    }

    #[test]
    fn test_params_validates_against_kind() {
        let request = CapabilityRequest::new(
            CapabilityKind::Camera,
            CapabilityOptions::new().with("quality", 150),
        );
        assert!(request.params().is_err());

        let request = CapabilityRequest::new(
            CapabilityKind::Camera,
            CapabilityOptions::new().with("quality", 80),
        );
        assert!(request.params().is_ok());
    }
}
