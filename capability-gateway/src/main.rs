//! Capability gateway demo - walks through every device capability against a
//! simulated device and prints what an observer would show.

use std::env;

use capability_gateway::render::describe;
use capability_gateway::{
    CapabilityGateway, Config, DemoStep, HandlerRegistry, SimulatedDevice,
};
use capgate_common::{CapabilityKind, CapabilityOptions};
use futures_util::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("capgate-demo {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Check config.toml or the CAPGATE__SECTION__KEY environment variables.",
            e
        )
    })?;

    // Register the simulated device
    let device = SimulatedDevice::new(config.device.clone());
    let mut registry = HandlerRegistry::new();
    registry.register_all(device.handlers())?;
    tracing::info!(
        kinds = ?registry.kinds(),
        absent = ?config.device.absent,
        denied = ?config.device.denied,
        "Registered simulated device"
    );

    let gateway = CapabilityGateway::new(registry, config.gateway.clone());

    for step in &config.demo.steps {
        run_step(&gateway, &config, *step).await;
    }

    Ok(())
}

async fn run_step(gateway: &CapabilityGateway, config: &Config, step: DemoStep) {
    let demo = &config.demo;
    let (kind, options) = match step {
        DemoStep::Location => (CapabilityKind::Location, CapabilityOptions::new()),
        DemoStep::Beep => (
            CapabilityKind::Notification,
            CapabilityOptions::new().with("action", "beep").with("count", 2),
        ),
        DemoStep::Vibrate => (
            CapabilityKind::Notification,
            CapabilityOptions::new().with("action", "vibrate"),
        ),
        DemoStep::Accelerometer => {
            watch_acceleration(gateway, demo.watch_samples).await;
            return;
        }
        DemoStep::Camera => (
            CapabilityKind::Camera,
            CapabilityOptions::new().with("quality", 50),
        ),
        DemoStep::ReadFile => (
            CapabilityKind::FileRead,
            CapabilityOptions::new().with("path", demo.read_path.as_str()),
        ),
        DemoStep::WriteFile => (
            CapabilityKind::FileWrite,
            CapabilityOptions::new()
                .with("path", demo.write_path.as_str())
                .with("contents", demo.write_contents.as_str()),
        ),
        DemoStep::Contacts => (
            CapabilityKind::Contacts,
            CapabilityOptions::new()
                .with("filter", "")
                .with("multiple", true)
                .with("limit", 5),
        ),
        DemoStep::Network => (
            CapabilityKind::NetworkReachability,
            CapabilityOptions::new().with("host", demo.reachability_host.as_str()),
        ),
    };

    println!("[{:?}] availability: {:?}", step, gateway.check_availability(kind));
    let result = gateway.request(kind, options).await;
    println!("[{:?}] {}", step, describe(&result));
}

/// Toggle the accelerometer on, show a few readings, toggle it off.
async fn watch_acceleration(gateway: &CapabilityGateway, samples: usize) {
    let options = CapabilityOptions::new().with("frequency_ms", 1000);
    let (handle, mut readings) = gateway.start_watch(CapabilityKind::Accelerometer, options);

    let mut shown = 0;
    while shown < samples {
        match readings.next().await {
            Some(result) => {
                println!("[Accelerometer] {}", describe(&result));
                if !result.is_success() {
                    break;
                }
                shown += 1;
            }
            None => break,
        }
    }

    gateway.cancel_watch(&handle);
    println!("[Accelerometer] watch {:?}", handle.state());
}
