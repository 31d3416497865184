//! Simulator engine binary for the PLC data-plane simulator.
//!
//! This is the main entry point that wires together the simulated
//! controller, the tick loop, the sample consumer, and shutdown
//! handling. It loads configuration, constructs all subsystems, and
//! runs the simulation loop until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `plcsim-config.yaml`
//! 3. Construct the controller (blocks, tags, seeded RNG)
//! 4. Create the bounded channel publisher and its consumer task
//! 5. Install the Ctrl-C handler feeding the run state machine
//! 6. Run the simulation loop
//! 7. Log the final counter snapshot

mod error;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use plcsim_core::config::SimulatorConfig;
use plcsim_core::control::ControlState;
use plcsim_core::plc::Plc;
use plcsim_core::publisher::ChannelPublisher;
use plcsim_core::runner;

use crate::error::EngineError;

/// Buffer capacity between the tick loop and the sample consumer.
/// Sized for several full scans of a typical tag count so a briefly
/// slow consumer loses nothing.
const PUBLISH_BUFFER: usize = 256;

/// Application entry point for the simulator engine.
///
/// Initializes all subsystems and runs the simulation loop until
/// Ctrl-C. Returns an error code on failure.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the loop fails to
/// start.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("plcsim-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        plc_id = config.plc.id,
        plc_name = config.plc.name,
        update_rate_ms = config.plc.update_rate_ms,
        seed = config.plc.seed,
        data_blocks = config.data_blocks.len(),
        "Configuration loaded"
    );

    // 3. Construct the controller.
    let plc = Plc::new(&config)?;
    let metrics = plc.metrics();
    let plc = Arc::new(RwLock::new(plc));

    // 4. Create the publisher and its consumer task. The consumer just
    //    logs samples; it stands in for a protocol frontend and exits
    //    when the loop drops the sending side.
    let (publisher, mut receiver) = ChannelPublisher::new(PUBLISH_BUFFER);
    let consumer = tokio::spawn(async move {
        while let Some(sample) = receiver.recv().await {
            tracing::debug!(
                address = %sample.address,
                value = %sample.value,
                quality = ?sample.quality,
                "Sample"
            );
        }
    });

    // 5. Install the Ctrl-C handler.
    let control = Arc::new(ControlState::new());
    let shutdown_control = Arc::clone(&control);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown_control.request_stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    // 6. Run the simulation loop.
    let result = runner::run_simulator(plc, control, publisher)
        .await
        .map_err(EngineError::from)?;

    // 7. Drain the consumer and log the final snapshot.
    let _ = consumer.await;
    let snapshot = metrics.snapshot();
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        samples_published = snapshot.samples_published,
        publish_failures = snapshot.publish_failures,
        writes_applied = snapshot.writes_applied,
        writes_ignored = snapshot.writes_ignored,
        writes_rejected = snapshot.writes_rejected,
        "plcsim-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulator configuration.
///
/// The path comes from the `PLCSIM_CONFIG` environment variable when
/// set, otherwise `plcsim-config.yaml` in the current working
/// directory. A missing file falls back to the built-in demo
/// configuration so a bare invocation produces visible traffic.
fn load_config() -> Result<SimulatorConfig, EngineError> {
    let path = std::env::var("PLCSIM_CONFIG").unwrap_or_else(|_| "plcsim-config.yaml".to_owned());
    let config_path = Path::new(&path);
    if config_path.exists() {
        let config = SimulatorConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!(path = %path, "Config file not found, using demo configuration");
        Ok(SimulatorConfig::demo())
    }
}
