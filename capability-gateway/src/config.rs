//! Configuration for the capability gateway and its demo device.

use std::path::Path;

use capgate_common::{CapabilityKind, Contact, Position, Reachability};
use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewaySettings,
    /// Simulated device used by the demo binary
    #[serde(default)]
    pub device: DeviceProfile,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Timing bounds enforced by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Upper bound on a one-shot request before it fails with Timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Watch intervals below this are raised to it.
    #[serde(default = "default_min_watch_interval")]
    pub min_watch_interval_ms: u64,
    /// Interval used when a watch does not ask for one.
    #[serde(default = "default_watch_interval")]
    pub default_watch_interval_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            min_watch_interval_ms: default_min_watch_interval(),
            default_watch_interval_ms: default_watch_interval(),
        }
    }
}

impl GatewaySettings {
    /// Sampling interval for a watch, clamped to the configured minimum.
    pub fn watch_interval_ms(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_watch_interval_ms)
            .max(self.min_watch_interval_ms)
            .max(1)
    }
}

/// A file seeded into the simulated device's storage.
#[derive(Debug, Clone, Deserialize)]
pub struct FileFixture {
    pub path: String,
    pub contents: String,
}

/// Behaviour of the simulated device bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceProfile {
    /// Capabilities the device lacks; they report Unavailable.
    #[serde(default)]
    pub absent: Vec<CapabilityKind>,
    /// Capabilities the user declined; they fail with a permission error.
    #[serde(default)]
    pub denied: Vec<CapabilityKind>,
    /// Artificial delay before each device reply.
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default = "default_position")]
    pub location: Position,
    #[serde(default = "default_reachability")]
    pub reachability: Reachability,
    #[serde(default = "default_contacts")]
    pub contacts: Vec<Contact>,
    #[serde(default = "default_files")]
    pub files: Vec<FileFixture>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            absent: vec![],
            denied: vec![],
            latency_ms: 0,
            location: default_position(),
            reachability: default_reachability(),
            contacts: default_contacts(),
            files: default_files(),
        }
    }
}

/// One button of the demo walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoStep {
    Location,
    Beep,
    Vibrate,
    Accelerometer,
    Camera,
    ReadFile,
    WriteFile,
    Contacts,
    Network,
}

impl DemoStep {
    pub const ALL: [DemoStep; 9] = [
        DemoStep::Location,
        DemoStep::Beep,
        DemoStep::Vibrate,
        DemoStep::Accelerometer,
        DemoStep::Camera,
        DemoStep::ReadFile,
        DemoStep::WriteFile,
        DemoStep::Contacts,
        DemoStep::Network,
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_steps")]
    pub steps: Vec<DemoStep>,
    /// Accelerometer readings to show before cancelling the watch.
    #[serde(default = "default_watch_samples")]
    pub watch_samples: usize,
    #[serde(default = "default_reachability_host")]
    pub reachability_host: String,
    #[serde(default = "default_read_path")]
    pub read_path: String,
    #[serde(default = "default_write_path")]
    pub write_path: String,
    #[serde(default = "default_write_contents")]
    pub write_contents: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            watch_samples: default_watch_samples(),
            reachability_host: default_reachability_host(),
            read_path: default_read_path(),
            write_path: default_write_path(),
            write_contents: default_write_contents(),
        }
    }
}

// Default values
fn default_request_timeout() -> u64 {
    30_000
}
fn default_min_watch_interval() -> u64 {
    50
}
fn default_watch_interval() -> u64 {
    1_000
}
fn default_position() -> Position {
    Position {
        latitude: 37.0,
        longitude: -122.0,
        accuracy: 10.0,
        altitude: None,
    }
}
fn default_reachability() -> Reachability {
    Reachability::Wifi
}
fn default_contacts() -> Vec<Contact> {
    ["Ada Lovelace", "Alan Turing", "Grace Hopper"]
        .iter()
        .enumerate()
        .map(|(i, name)| Contact {
            display_name: Some(name.to_string()),
            phone_numbers: vec![format!("+1 555 010{}", i)],
            emails: vec![format!(
                "{}@example.com",
                name.to_lowercase().replace(' ', ".")
            )],
        })
        .collect()
}
fn default_files() -> Vec<FileFixture> {
    vec![FileFixture {
        path: default_read_path(),
        contents: "Hello from device storage".to_string(),
    }]
}
fn default_steps() -> Vec<DemoStep> {
    DemoStep::ALL.to_vec()
}
fn default_watch_samples() -> usize {
    3
}
fn default_reachability_host() -> String {
    "www.mobiledevelopersolutions.com".to_string()
}
fn default_read_path() -> String {
    "/sdcard/phonegap.txt".to_string()
}
fn default_write_path() -> String {
    "foo.txt".to_string()
}
fn default_write_contents() -> String {
    "This is a test of writing to a file".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (CAPGATE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config").required(false))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Load configuration from an explicit file, still honouring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLoader::builder()
            .set_default("gateway.request_timeout_ms", default_request_timeout() as i64)?
            .set_default(
                "gateway.min_watch_interval_ms",
                default_min_watch_interval() as i64,
            )?
            .set_default(
                "gateway.default_watch_interval_ms",
                default_watch_interval() as i64,
            )
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CAPGATE")
        .separator("__")
        .try_parsing(true)
}
