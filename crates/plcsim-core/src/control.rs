//! The `Idle -> Running -> Stopping -> Stopped` run state machine.
//!
//! The state lives in a single atomic so the tick loop can poll it
//! every iteration without taking a lock, while any number of control
//! handles (signal handler, operator surface, tests) request
//! transitions concurrently. Transitions are compare-and-swap based;
//! invalid ones are either rejected ([`ControlState::start`]) or
//! absorbed ([`ControlState::request_stop`] is idempotent).

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

/// Floor for the adjustable tick interval. Keeps a runtime adjustment
/// from spinning the loop flat out.
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// The run states the engine moves through, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// Constructed, tick loop not yet started.
    Idle = 0,
    /// Tick loop active.
    Running = 1,
    /// Stop requested, loop finishing its current tick.
    Stopping = 2,
    /// Loop exited; terminal.
    Stopped = 3,
}

impl RunState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl core::fmt::Display for RunState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        write!(f, "{label}")
    }
}

/// Errors from run state transitions.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// `start` was called when the engine was not idle. The state
    /// machine is strictly forward, a stopped engine cannot restart.
    #[error("engine cannot start from state {state}")]
    NotIdle {
        /// The state the engine was in.
        state: RunState,
    },
}

/// Shared run state handle, cloned behind an `Arc` between the tick
/// loop and whoever requests shutdown.
#[derive(Debug, Default)]
pub struct ControlState {
    state: AtomicU8,

    /// Runtime tick-interval override in milliseconds; zero means
    /// "use the configured default".
    tick_interval_ms: AtomicU64,
}

impl ControlState {
    /// A fresh handle in [`RunState::Idle`] with no interval override.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(RunState::Idle as u8),
            tick_interval_ms: AtomicU64::new(0),
        }
    }

    /// Override the tick interval at runtime, floored at
    /// [`MIN_TICK_INTERVAL_MS`]. Takes effect from the next sleep.
    pub fn set_tick_interval_ms(&self, ms: u64) {
        self.tick_interval_ms
            .store(ms.max(MIN_TICK_INTERVAL_MS), Ordering::Release);
    }

    /// The current interval override, if one has been set.
    pub fn tick_interval(&self) -> Option<Duration> {
        match self.tick_interval_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// The current run state.
    pub fn current(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the tick loop should keep going.
    pub fn is_running(&self) -> bool {
        self.current() == RunState::Running
    }

    /// Move `Idle -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NotIdle`] if the engine is already
    /// running or has been stopped; the machine never moves backwards.
    pub fn start(&self) -> Result<(), ControlError> {
        self.state
            .compare_exchange(
                RunState::Idle as u8,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|found| ControlError::NotIdle {
                state: RunState::from_u8(found),
            })
    }

    /// Request shutdown. Idempotent: `Running` becomes `Stopping`, an
    /// engine that never started goes straight to `Stopped`, and
    /// repeated calls are no-ops.
    pub fn request_stop(&self) {
        let _ = self.state.compare_exchange(
            RunState::Running as u8,
            RunState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        let _ = self.state.compare_exchange(
            RunState::Idle as u8,
            RunState::Stopped as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Move to the terminal `Stopped` state. Called by the tick loop
    /// once it has finished its final tick.
    pub fn mark_stopped(&self) {
        self.state.store(RunState::Stopped as u8, Ordering::Release);
    }
}
