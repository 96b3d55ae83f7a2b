//! The Capability Gateway.
//!
//! One entry point for every device capability: availability probes,
//! one-shot requests, and continuous watches. Results are always delivered as
//! `CapabilityResult` values; nothing device-related is returned as an error.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use capgate_common::{
    AvailabilityState, CapabilityKind, CapabilityOptions, CapabilityParams, CapabilityRequest,
    CapabilityResult, ErrorCode, Failure, RawError,
};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::bridge::{CapabilityHandler, HandlerRegistry};
use crate::config::GatewaySettings;
use crate::decode::decode_payload;
use crate::normalize::normalize_error;
use crate::watch::{lock, Transition, WatchHandle, WatchStream};

/// Kinds a completed request has shown to be present, used when a handler
/// cannot tell. Only successes are recorded.
#[derive(Default)]
struct ProbeCache {
    seen: Mutex<HashSet<CapabilityKind>>,
}

impl ProbeCache {
    fn record(&self, kind: CapabilityKind, result: &CapabilityResult) {
        if result.is_success() {
            lock(&self.seen).insert(kind);
        }
    }

    fn get(&self, kind: CapabilityKind) -> Option<AvailabilityState> {
        lock(&self.seen)
            .contains(&kind)
            .then_some(AvailabilityState::Available)
    }
}

/// Uniform entry and exit point for device-capability access.
///
/// Requests and watches spawn onto the ambient Tokio runtime, so the gateway
/// must be used from within one.
pub struct CapabilityGateway {
    registry: HandlerRegistry,
    settings: GatewaySettings,
    /// At most one active watch per kind
    watches: Mutex<HashMap<CapabilityKind, WatchHandle>>,
    probes: Arc<ProbeCache>,
}

impl CapabilityGateway {
    pub fn new(registry: HandlerRegistry, settings: GatewaySettings) -> Self {
        Self {
            registry,
            settings,
            watches: Mutex::new(HashMap::new()),
            probes: Arc::new(ProbeCache::default()),
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Synchronous, side-effect free presence probe.
    pub fn check_availability(&self, kind: CapabilityKind) -> AvailabilityState {
        match self.registry.get(kind) {
            None => AvailabilityState::Unavailable,
            Some(handler) => match handler.availability() {
                AvailabilityState::Unknown => self
                    .probes
                    .get(kind)
                    .unwrap_or(AvailabilityState::Unknown),
                known => known,
            },
        }
    }

    /// Map a raw bridge error onto the normalized taxonomy.
    pub fn normalize_error(&self, raw: &RawError, kind: CapabilityKind) -> Failure {
        normalize_error(raw, kind)
    }

    /// Issue a one-shot request.
    ///
    /// Returns immediately. The returned future resolves to exactly one
    /// result; failures detected before the device call (unsupported kind,
    /// invalid options, unavailable device) resolve it without touching the
    /// bridge.
    pub fn request(&self, kind: CapabilityKind, options: CapabilityOptions) -> PendingRequest {
        let request = CapabilityRequest::new(kind, options);
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest {
            id: request.id(),
            kind,
            rx,
        };

        let (handler, params) = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(failure) => {
                tracing::info!(
                    kind = %kind,
                    request_id = %request.id(),
                    code = %failure.code,
                    options = ?request.options(),
                    "Request rejected: {}",
                    failure.message
                );
                let _ = tx.send(CapabilityResult::Failure(failure));
                return pending;
            }
        };

        let timeout_ms = params
            .timeout_ms()
            .unwrap_or(self.settings.request_timeout_ms);
        let probes = self.probes.clone();
        let request_id = request.id();
        tracing::debug!(
            kind = %kind,
            request_id = %request_id,
            issued_at = %request.issued_at(),
            timeout_ms,
            "Dispatching request"
        );

        tokio::spawn(async move {
            let result = invoke(handler.as_ref(), &params, timeout_ms).await;
            probes.record(kind, &result);
            match &result {
                CapabilityResult::Success(_) => {
                    tracing::info!(kind = %kind, request_id = %request_id, "Request succeeded")
                }
                CapabilityResult::Failure(f) => tracing::warn!(
                    kind = %kind,
                    request_id = %request_id,
                    code = %f.code,
                    "Request failed: {}",
                    f.message
                ),
            }
            if tx.send(result).is_err() {
                tracing::debug!(request_id = %request_id, "Observer went away before delivery");
            }
        });

        pending
    }

    /// Begin continuous delivery for a watchable kind.
    ///
    /// Returns without touching the device. Any active watch of the same kind
    /// is cancelled first (last start wins) and its sensor is released in the
    /// background. A rejected start returns an already-cancelled handle whose
    /// stream yields one failure.
    pub fn start_watch(
        &self,
        kind: CapabilityKind,
        options: CapabilityOptions,
    ) -> (WatchHandle, WatchStream) {
        let request = CapabilityRequest::new(kind, options);

        let prepared = if kind.supports_watch() {
            self.prepare(&request)
        } else {
            Err(Failure::new(
                kind,
                ErrorCode::UnsupportedCapability,
                format!("{} does not support continuous watches", kind),
            ))
        };

        let (handler, params) = match prepared {
            Ok(prepared) => prepared,
            Err(failure) => {
                tracing::info!(
                    kind = %kind,
                    watch_id = %request.id(),
                    code = %failure.code,
                    "Watch rejected: {}",
                    failure.message
                );
                let handle = WatchHandle::new(request.id(), kind, None);
                handle.cancel();
                let stream = WatchStream::rejected(handle.clone(), failure);
                return (handle, stream);
            }
        };

        let requested = match &params {
            CapabilityParams::Accelerometer(p) => p.frequency_ms,
            _ => None,
        };
        let period_ms = self.settings.watch_interval_ms(requested);

        let handle = WatchHandle::new(request.id(), kind, Some(handler.clone()));
        let replaced = {
            let mut watches = lock(&self.watches);
            let replaced = watches.remove(&kind).map(|old| {
                let transition = old.cancel();
                (old, transition)
            });
            handle.activate();
            watches.insert(kind, handle.clone());
            replaced
        };

        if let Some((old, transition)) = replaced {
            tracing::info!(
                kind = %kind,
                watch_id = %old.id(),
                replaced_by = %handle.id(),
                "Replacing active watch"
            );
            if let Transition::Cancelled(Some(lease)) = transition {
                old.release_detached(lease);
            }
        }

        tracing::info!(kind = %kind, watch_id = %handle.id(), period_ms, "Watch started");
        let stream = WatchStream::new(
            handle.clone(),
            handler,
            params,
            Duration::from_millis(period_ms),
        );
        (handle, stream)
    }

    /// Cancel a watch. Idempotent: returns true only for the call that
    /// actually cancelled it.
    ///
    /// The handle is `Cancelled` when this returns; the sensor is closed in
    /// the background.
    pub fn cancel_watch(&self, handle: &WatchHandle) -> bool {
        let transition = {
            let mut watches = lock(&self.watches);
            let transition = handle.cancel();
            if watches
                .get(&handle.kind())
                .is_some_and(|current| current.same_watch(handle))
            {
                watches.remove(&handle.kind());
            }
            transition
        };

        match transition {
            Transition::AlreadyCancelled => false,
            Transition::Cancelled(lease) => {
                tracing::info!(kind = %handle.kind(), watch_id = %handle.id(), "Watch cancelled");
                if let Some(lease) = lease {
                    handle.release_detached(lease);
                }
                true
            }
        }
    }

    /// The active watch for a kind, if any.
    pub fn active_watch(&self, kind: CapabilityKind) -> Option<WatchHandle> {
        let mut watches = lock(&self.watches);
        watches.retain(|_, h| h.is_active());
        watches.get(&kind).cloned()
    }

    /// Number of active watches across all kinds.
    pub fn active_watch_count(&self) -> usize {
        let mut watches = lock(&self.watches);
        watches.retain(|_, h| h.is_active());
        watches.len()
    }

    /// Checks that run before any device call, in order: handler lookup,
    /// option validation, availability.
    fn prepare(
        &self,
        request: &CapabilityRequest,
    ) -> Result<(Arc<dyn CapabilityHandler>, CapabilityParams), Failure> {
        let kind = request.kind();
        let handler = self
            .registry
            .get(kind)
            .ok_or_else(|| Failure::unsupported(kind))?;
        let params = request
            .params()
            .map_err(|e| Failure::validation(kind, e.message))?;
        if handler.availability().is_unavailable() {
            return Err(Failure::unavailable(kind));
        }
        Ok((handler, params))
    }
}

async fn invoke(
    handler: &dyn CapabilityHandler,
    params: &CapabilityParams,
    timeout_ms: u64,
) -> CapabilityResult {
    let kind = params.kind();
    let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), handler.invoke(params)).await;
    let decoded = match outcome {
        Err(_) => Err(Failure::timeout(kind, timeout_ms)),
        Ok(Err(raw)) => Err(normalize_error(&raw, kind)),
        Ok(Ok(value)) => decode_payload(params, value),
    };
    decoded.into()
}

/// A request in flight. Resolves to its single result.
#[derive(Debug)]
pub struct PendingRequest {
    id: Uuid,
    kind: CapabilityKind,
    rx: oneshot::Receiver<CapabilityResult>,
}

impl PendingRequest {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }
}

impl Future for PendingRequest {
    type Output = CapabilityResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let kind = self.kind;
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                CapabilityResult::Failure(Failure::unknown(
                    kind,
                    "Request was dropped before a result was delivered",
                ))
            })
        })
    }
}
