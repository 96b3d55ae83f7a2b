//! Continuous capability watches.
//!
//! A watch is a `WatchHandle` (lifecycle, owned by the caller) paired with a
//! `WatchStream` (the readings). The stream is lazy: nothing touches the
//! device until it is first polled. Cancellation goes through the handle and
//! is published on a `tokio::sync::watch` channel, so a stream parked on a
//! tick or a sample wakes up and ends instead of delivering.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use capgate_common::{CapabilityKind, CapabilityParams, CapabilityResult, Failure};
use futures_util::stream::{self, BoxStream, Stream};
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::bridge::{CapabilityHandler, SensorLease};
use crate::decode::decode_payload;
use crate::normalize::normalize_error;

/// Lifecycle of a watch. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Created,
    Active,
    Cancelled,
}

/// Outcome of moving a watch to `Cancelled`.
pub(crate) enum Transition {
    /// Someone else got there first.
    AlreadyCancelled,
    /// This call cancelled the watch; the lease, if one was open, must be closed.
    Cancelled(Option<SensorLease>),
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct WatchShared {
    id: Uuid,
    kind: CapabilityKind,
    state: watch::Sender<WatchState>,
    /// Guards the lease and serializes it against state changes.
    lease: Mutex<Option<SensorLease>>,
    handler: Option<Arc<dyn CapabilityHandler>>,
}

/// Caller-owned handle to a continuous subscription.
#[derive(Clone)]
pub struct WatchHandle {
    shared: Arc<WatchShared>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.shared.id)
            .field("kind", &self.shared.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl WatchHandle {
    pub(crate) fn new(
        id: Uuid,
        kind: CapabilityKind,
        handler: Option<Arc<dyn CapabilityHandler>>,
    ) -> Self {
        let (state, _) = watch::channel(WatchState::Created);
        Self {
            shared: Arc::new(WatchShared {
                id,
                kind,
                state,
                lease: Mutex::new(None),
                handler,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn kind(&self) -> CapabilityKind {
        self.shared.kind
    }

    pub fn state(&self) -> WatchState {
        *self.shared.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == WatchState::Active
    }

    /// Whether both handles refer to the same watch.
    pub fn same_watch(&self, other: &WatchHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn activate(&self) {
        let _guard = lock(&self.shared.lease);
        self.shared.state.send_if_modified(|state| {
            if *state == WatchState::Created {
                *state = WatchState::Active;
                true
            } else {
                false
            }
        });
    }

    /// Move to `Cancelled`, handing back any open lease exactly once.
    pub(crate) fn cancel(&self) -> Transition {
        let mut lease = lock(&self.shared.lease);
        let changed = self.shared.state.send_if_modified(|state| {
            if *state == WatchState::Cancelled {
                false
            } else {
                *state = WatchState::Cancelled;
                true
            }
        });
        if changed {
            Transition::Cancelled(lease.take())
        } else {
            Transition::AlreadyCancelled
        }
    }

    /// Close a lease returned by `cancel`.
    pub(crate) async fn release(&self, lease: SensorLease) {
        if let Some(handler) = &self.shared.handler {
            handler.close_sensor(lease).await;
            tracing::debug!(
                kind = %self.shared.kind,
                watch_id = %self.shared.id,
                lease = %lease,
                "Released sensor"
            );
        }
    }

    /// Close a lease on a background task so the caller never waits on the
    /// bridge.
    pub(crate) fn release_detached(&self, lease: SensorLease) {
        let handle = self.clone();
        tokio::spawn(async move { handle.release(lease).await });
    }

    /// Store a freshly opened lease. Returns it back if the watch was
    /// cancelled while the sensor was opening.
    fn attach(&self, lease: SensorLease) -> Option<SensorLease> {
        let mut slot = lock(&self.shared.lease);
        if self.state() == WatchState::Cancelled {
            Some(lease)
        } else {
            *slot = Some(lease);
            None
        }
    }

    fn subscribe(&self) -> watch::Receiver<WatchState> {
        self.shared.state.subscribe()
    }
}

/// Resolves once the watch reaches `Cancelled`.
async fn cancelled(rx: &mut watch::Receiver<WatchState>) {
    // The sender lives as long as the handle this receiver came from
    let _ = rx.wait_for(|s| *s == WatchState::Cancelled).await;
}

enum Phase {
    /// Start was rejected; deliver this failure and stop.
    Rejected(Failure),
    Opening,
    Sampling { ticker: Interval, lease: SensorLease },
    Done,
}

struct Cursor {
    handle: WatchHandle,
    handler: Option<Arc<dyn CapabilityHandler>>,
    params: Option<CapabilityParams>,
    period: Duration,
    phase: Phase,
}

impl Cursor {
    async fn advance(mut self) -> Option<(CapabilityResult, Self)> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::Rejected(failure) => {
                    return Some((CapabilityResult::Failure(failure), self));
                }
                Phase::Opening => {
                    let (handler, params) = match (&self.handler, &self.params) {
                        (Some(h), Some(p)) => (h.clone(), p.clone()),
                        _ => return None,
                    };
                    let mut rx = self.handle.subscribe();
                    let opened = tokio::select! {
                        biased;
                        _ = cancelled(&mut rx) => return None,
                        opened = handler.open_sensor(&params) => opened,
                    };
                    let lease = match opened {
                        Ok(lease) => lease,
                        Err(raw) => {
                            let failure = normalize_error(&raw, self.handle.kind());
                            return Some(self.terminate(failure).await);
                        }
                    };
                    if let Some(lease) = self.handle.attach(lease) {
                        handler.close_sensor(lease).await;
                        return None;
                    }
                    tracing::debug!(
                        kind = %self.handle.kind(),
                        watch_id = %self.handle.id(),
                        lease = %lease,
                        period_ms = self.period.as_millis() as u64,
                        "Sensor opened"
                    );
                    let mut ticker = interval(self.period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.phase = Phase::Sampling { ticker, lease };
                }
                Phase::Sampling { mut ticker, lease } => {
                    let handler = match &self.handler {
                        Some(h) => h.clone(),
                        None => return None,
                    };
                    let mut rx = self.handle.subscribe();
                    tokio::select! {
                        biased;
                        _ = cancelled(&mut rx) => return None,
                        _ = ticker.tick() => {}
                    }
                    let sampled = tokio::select! {
                        biased;
                        _ = cancelled(&mut rx) => return None,
                        sampled = handler.sample(lease) => sampled,
                    };
                    // Nothing starts delivery once cancelled
                    if !self.handle.is_active() {
                        return None;
                    }
                    let decoded = match (sampled, &self.params) {
                        (Ok(value), Some(params)) => decode_payload(params, value),
                        (Err(raw), _) => Err(normalize_error(&raw, self.handle.kind())),
                        (Ok(_), None) => return None,
                    };
                    return match decoded {
                        Ok(payload) => {
                            self.phase = Phase::Sampling { ticker, lease };
                            Some((CapabilityResult::Success(payload), self))
                        }
                        Err(failure) => Some(self.terminate(failure).await),
                    };
                }
            }
        }
    }

    /// End the stream with one final failure and release the sensor.
    async fn terminate(self, failure: Failure) -> (CapabilityResult, Self) {
        tracing::warn!(
            kind = %self.handle.kind(),
            watch_id = %self.handle.id(),
            code = %failure.code,
            "Watch terminated: {}",
            failure.message
        );
        if let Transition::Cancelled(Some(lease)) = self.handle.cancel() {
            self.handle.release(lease).await;
        }
        (CapabilityResult::Failure(failure), self)
    }
}

/// Readings from a watch, in sampling order.
///
/// Infinite while the watch is active. Ends after a final `Failure` if the
/// device fails, or silently once the handle is cancelled.
pub struct WatchStream {
    inner: BoxStream<'static, CapabilityResult>,
}

impl WatchStream {
    pub(crate) fn new(
        handle: WatchHandle,
        handler: Arc<dyn CapabilityHandler>,
        params: CapabilityParams,
        period: Duration,
    ) -> Self {
        Self::from_cursor(Cursor {
            handle,
            handler: Some(handler),
            params: Some(params),
            period,
            phase: Phase::Opening,
        })
    }

    /// A stream that delivers one failure and ends.
    pub(crate) fn rejected(handle: WatchHandle, failure: Failure) -> Self {
        Self::from_cursor(Cursor {
            handle,
            handler: None,
            params: None,
            period: Duration::ZERO,
            phase: Phase::Rejected(failure),
        })
    }

    fn from_cursor(cursor: Cursor) -> Self {
        Self {
            inner: Box::pin(stream::unfold(cursor, Cursor::advance)),
        }
    }
}

impl Stream for WatchStream {
    type Item = CapabilityResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for WatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStream").finish_non_exhaustive()
    }
}
