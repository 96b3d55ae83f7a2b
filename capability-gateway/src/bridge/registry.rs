//! Handler registry keyed by capability kind.

use std::collections::HashMap;
use std::sync::Arc;

use capgate_common::CapabilityKind;

use super::CapabilityHandler;
use crate::error::{Error, Result};

/// Registry of capability handlers.
///
/// Populated once before the gateway is built; lookups afterwards are
/// lock-free so they can run on the caller's path without awaiting.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<CapabilityKind, Arc<dyn CapabilityHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Each kind may only be registered once.
    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) -> Result<()> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(Error::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Register every handler in `handlers`.
    pub fn register_all(
        &mut self,
        handlers: impl IntoIterator<Item = Arc<dyn CapabilityHandler>>,
    ) -> Result<()> {
        for handler in handlers {
            self.register(handler)?;
        }
        Ok(())
    }

    /// Get the handler for a kind.
    pub fn get(&self, kind: CapabilityKind) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Kinds with a registered handler.
    pub fn kinds(&self) -> Vec<CapabilityKind> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use capgate_common::{CapabilityParams, RawError};
    use serde_json::Value;

    struct Stub(CapabilityKind);

    #[async_trait]
    impl CapabilityHandler for Stub {
        fn kind(&self) -> CapabilityKind {
            self.0
        }

        async fn invoke(&self, _params: &CapabilityParams) -> std::result::Result<Value, RawError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        registry
            .register(Arc::new(Stub(CapabilityKind::Camera)))
            .unwrap();

        assert!(!registry.is_empty());
        assert_eq!(registry.kinds(), vec![CapabilityKind::Camera]);
        assert!(registry.get(CapabilityKind::Camera).is_some());
        assert!(registry.get(CapabilityKind::Contacts).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(Stub(CapabilityKind::Location)))
            .unwrap();

        let err = registry
            .register(Arc::new(Stub(CapabilityKind::Location)))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateHandler(CapabilityKind::Location)));
    }
}
