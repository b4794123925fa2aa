//! # FCM Control
//!
//! Runs the command-and-control layer against the simulated flight
//! controller, speaking line-delimited JSON bus messages on stdin/stdout.
//!
//! ```bash
//! fcm-control [config.toml]
//! ```
//!
//! Logs go to stderr, and also to a daily rolling file when `[logging] dir`
//! is set.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fcm_control::bus::stdio::{read_messages, write_events};
use fcm_control::bus::EventPublisher;
use fcm_control::config::{Config, LoggingConfig};
use fcm_control::fcc::SimulatedFlightController;
use fcm_control::geo::Geodetic;
use fcm_control::ControlModule;

/// Simulated home position (PX4 SITL default)
const SIM_HOME: Geodetic = Geodetic { lat: 47.397742, lon: 8.545594, alt: 488.0 };

/// Period of simulated position telemetry
const TELEMETRY_PERIOD: Duration = Duration::from_millis(200);

/// Set up the global subscriber; keep the guard alive to flush file logs
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fcm-control.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let _guard = init_logging(&config.logging);

    info!("FCM Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let sim = Arc::new(SimulatedFlightController::new(SIM_HOME));
    let (events, events_rx) = EventPublisher::channel();
    let control = ControlModule::new(&config, sim.clone(), events);

    // Simulated position telemetry
    let router = control.router();
    let topics = config.bus.clone();
    let telemetry = tokio::spawn(async move {
        let mut ticker = interval(TELEMETRY_PERIOD);
        loop {
            ticker.tick().await;
            for message in sim.telemetry_messages(&topics) {
                router.route(message);
            }
        }
    });

    // Bus in
    let router = control.router();
    let reader = tokio::spawn(async move {
        if let Err(e) = read_messages(BufReader::new(tokio::io::stdin()), &router).await {
            error!("Bus input failed: {}", e);
        }
    });

    // Bus out
    let event_topic = config.bus.event_topic.clone();
    let writer = tokio::spawn(async move {
        if let Err(e) = write_events(tokio::io::stdout(), events_rx, &event_topic).await {
            error!("Bus output failed: {}", e);
        }
    });

    info!("Press Ctrl+C to exit");
    control
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down...");
        })
        .await?;

    telemetry.abort();
    reader.abort();
    writer.abort();
    Ok(())
}
