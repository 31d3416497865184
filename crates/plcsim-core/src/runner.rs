//! The periodic tick loop driving the whole engine.
//!
//! [`run_simulator`] registers every tag with the Publisher, moves the
//! run state to `Running`, and then ticks until a stop is requested or
//! the configured tick limit is reached. Each tick takes the engine
//! write lock once, advances the simulation by the measured wall-clock
//! delta, and streams the observed samples out through the Publisher
//! handles.
//!
//! The loop holds the lock only while ticking, so external writes land
//! between ticks; the sleep between ticks is the only yield point and
//! honors runtime interval adjustments from the control handle.
//! Publish failures are counted and skipped, never fatal.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use plcsim_types::TagAddress;

use crate::control::{ControlError, ControlState};
use crate::plc::Plc;
use crate::publisher::{PublishError, Publisher, PublisherHandle};

/// Errors that end the run before or at startup.
///
/// Once the loop is ticking, nothing but a stop request or the tick
/// limit ends it.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The run state machine refused to start.
    #[error(transparent)]
    Control {
        /// The underlying control error.
        #[from]
        source: ControlError,
    },

    /// The Publisher refused a tag registration.
    #[error("tag registration failed: {source}")]
    Register {
        /// The underlying publish error.
        #[from]
        source: PublishError,
    },
}

/// Why the simulation loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A cooperative stop was requested.
    StopRequested,
    /// The configured tick limit was reached.
    MaxTicksReached,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorResult {
    /// Why the loop ended.
    pub end_reason: EndReason,
    /// Ticks completed over the whole run.
    pub total_ticks: u64,
}

/// Drive the engine until a stop is requested via `control` or the
/// configured tick limit is reached.
///
/// Registers all tags, transitions `Idle -> Running`, then ticks. The
/// simulated time step of each tick is the measured wall-clock time
/// since the previous one, so a delayed tick drifts proportionally
/// further. The sleep between ticks uses the control handle's interval
/// override when one is set, falling back to the controller's
/// configured rate. On stop the loop finishes its current tick, skips
/// the final sleep, moves to `Stopped`, and logs the final counter
/// snapshot.
///
/// # Errors
///
/// Returns [`RunnerError`] if the engine is not idle or the Publisher
/// rejects a registration; in both cases no tick has run.
pub async fn run_simulator<P: Publisher>(
    plc: Arc<RwLock<Plc>>,
    control: Arc<ControlState>,
    mut publisher: P,
) -> Result<SimulatorResult, RunnerError> {
    let (descriptors, default_interval, max_ticks, metrics) = {
        let engine = plc.read().await;
        (
            engine.descriptors(),
            engine.update_interval(),
            engine.max_ticks(),
            engine.metrics(),
        )
    };

    let mut handles: HashMap<TagAddress, PublisherHandle> =
        HashMap::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let handle = publisher.register(descriptor)?;
        handles.insert(descriptor.address.clone(), handle);
    }

    control.start()?;
    info!(
        tags = handles.len(),
        interval_ms = default_interval.as_millis(),
        max_ticks = ?max_ticks,
        "Simulation loop started"
    );

    let mut end_reason = EndReason::StopRequested;
    let mut total_ticks: u64 = 0;
    let mut last_tick = Instant::now();

    while control.is_running() {
        let now = Instant::now();
        let dt_seconds = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;

        let samples = plc.write().await.tick(dt_seconds);
        for sample in samples {
            let Some(handle) = handles.get(&sample.address) else {
                metrics.record_publish_failure(1);
                warn!(address = %sample.address, "Sample for unregistered tag dropped");
                continue;
            };
            match publisher.publish(*handle, sample) {
                Ok(()) => metrics.record_published(1),
                Err(err) => {
                    metrics.record_publish_failure(1);
                    warn!(error = %err, "Sample dropped");
                }
            }
        }

        total_ticks = total_ticks.saturating_add(1);
        if max_ticks.is_some_and(|limit| total_ticks >= limit) {
            end_reason = EndReason::MaxTicksReached;
            control.request_stop();
        }

        // Skip the final sleep once a stop has been requested.
        if !control.is_running() {
            break;
        }
        let interval = control.tick_interval().unwrap_or(default_interval);
        tokio::time::sleep(interval).await;
    }

    control.mark_stopped();
    let snapshot = metrics.snapshot();
    info!(
        end_reason = ?end_reason,
        total_ticks,
        samples_published = snapshot.samples_published,
        publish_failures = snapshot.publish_failures,
        "Simulation loop stopped"
    );
    Ok(SimulatorResult {
        end_reason,
        total_ticks,
    })
}
