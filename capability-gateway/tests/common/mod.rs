//! Scriptable bridge handler for gateway tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use capability_gateway::{
    CapabilityGateway, CapabilityHandler, GatewaySettings, HandlerRegistry, SensorLease,
};
use capgate_common::{AvailabilityState, CapabilityKind, CapabilityParams, RawError};
use serde_json::{json, Value};

#[derive(Clone)]
pub enum Reply {
    Success(Value),
    Failure(RawError),
    /// Never answers
    Hang,
}

/// A handler that answers from a script and counts every bridge call.
pub struct FakeHandler {
    kind: CapabilityKind,
    availability: AvailabilityState,
    reply: Reply,
    delay: Option<Duration>,
    open_error: Option<RawError>,
    /// Sample number (1-based) at which the sensor starts failing
    fail_sample_at: Option<usize>,
    /// `close_sensor` never returns
    hang_on_close: bool,
    pub invocations: AtomicUsize,
    pub opens: AtomicUsize,
    pub samples: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeHandler {
    pub fn new(kind: CapabilityKind, reply: Reply) -> Self {
        Self {
            kind,
            availability: AvailabilityState::Available,
            reply,
            delay: None,
            open_error: None,
            fail_sample_at: None,
            hang_on_close: false,
            invocations: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            samples: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(kind: CapabilityKind) -> Self {
        Self::new(kind, Reply::Success(sample_success(kind)))
    }

    pub fn failing(kind: CapabilityKind, raw: RawError) -> Self {
        Self::new(kind, Reply::Failure(raw))
    }

    pub fn with_availability(mut self, availability: AvailabilityState) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_open_error(mut self, raw: RawError) -> Self {
        self.open_error = Some(raw);
        self
    }

    pub fn failing_at_sample(mut self, n: usize) -> Self {
        self.fail_sample_at = Some(n);
        self
    }

    pub fn hanging_on_close(mut self) -> Self {
        self.hang_on_close = true;
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityHandler for FakeHandler {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    fn availability(&self) -> AvailabilityState {
        self.availability
    }

    async fn invoke(&self, _params: &CapabilityParams) -> Result<Value, RawError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Success(value) => Ok(value.clone()),
            Reply::Failure(raw) => Err(raw.clone()),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn open_sensor(&self, _params: &CapabilityParams) -> Result<SensorLease, RawError> {
        let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.open_error {
            Some(raw) => Err(raw.clone()),
            None => Ok(SensorLease(n as u64)),
        }
    }

    async fn sample(&self, _lease: SensorLease) -> Result<Value, RawError> {
        let n = self.samples.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_sample_at.is_some_and(|at| n >= at) {
            return Err(RawError::named("NotReadableError", "sensor lost"));
        }
        Ok(json!({ "x": n as f64, "y": 0.0, "z": 9.81 }))
    }

    async fn close_sensor(&self, _lease: SensorLease) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
    }
}

/// Let background tasks (sensor release) run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// A well-formed raw success value for each kind.
pub fn sample_success(kind: CapabilityKind) -> Value {
    match kind {
        CapabilityKind::Location => {
            json!({"coords": {"latitude": 37.0, "longitude": -122.0, "accuracy": 10}})
        }
        CapabilityKind::Accelerometer => json!({"x": 0.1, "y": 0.2, "z": 9.81}),
        // "/9j/" is the base64 prefix of a JPEG start-of-image marker
        CapabilityKind::Camera => json!("/9j/4AAQ"),
        CapabilityKind::FileRead => json!("file body"),
        CapabilityKind::FileWrite => Value::Null,
        CapabilityKind::Contacts => json!([{"displayName": "Ada"}]),
        CapabilityKind::NetworkReachability => json!({"code": 2}),
        CapabilityKind::Notification => Value::Null,
    }
}

/// Options that pass validation for each kind.
pub fn valid_options(kind: CapabilityKind) -> capgate_common::CapabilityOptions {
    use capgate_common::CapabilityOptions;
    match kind {
        CapabilityKind::FileRead => CapabilityOptions::new().with("path", "/sdcard/phonegap.txt"),
        CapabilityKind::FileWrite => CapabilityOptions::new()
            .with("path", "foo.txt")
            .with("contents", "This is a test of writing to a file"),
        CapabilityKind::NetworkReachability => {
            CapabilityOptions::new().with("host", "www.mobiledevelopersolutions.com")
        }
        CapabilityKind::Notification => CapabilityOptions::new().with("action", "beep"),
        _ => CapabilityOptions::new(),
    }
}

pub fn settings() -> GatewaySettings {
    GatewaySettings {
        request_timeout_ms: 1_000,
        min_watch_interval_ms: 50,
        default_watch_interval_ms: 100,
    }
}

/// A gateway serving exactly the given handlers.
pub fn gateway_with(handlers: Vec<Arc<FakeHandler>>) -> CapabilityGateway {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler).unwrap();
    }
    CapabilityGateway::new(registry, settings())
}
