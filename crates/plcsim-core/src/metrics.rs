//! Lock-free diagnostic counters and their snapshot.
//!
//! The counters live outside the engine lock so diagnostics never
//! contend with the tick loop: recording is a relaxed atomic increment,
//! reading is a [`snapshot`](SimulatorMetrics::snapshot) that copies
//! all counters at once. Relaxed ordering is fine here, the counters
//! carry no synchronization responsibility.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters describing engine activity since start.
#[derive(Debug, Default)]
pub struct SimulatorMetrics {
    /// Completed ticks.
    ticks: AtomicU64,

    /// Samples handed to the Publisher.
    samples_published: AtomicU64,

    /// Samples the Publisher could not accept (e.g. full channel).
    publish_failures: AtomicU64,

    /// Tag value observations (per-tag reads, including tick sampling).
    reads: AtomicU64,

    /// External writes that were stored.
    writes_applied: AtomicU64,

    /// External writes silently ignored (read-only target).
    writes_ignored: AtomicU64,

    /// External writes rejected (unknown address or unrepresentable
    /// value).
    writes_rejected: AtomicU64,
}

impl SimulatorMetrics {
    /// Record one completed tick.
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record samples handed to the Publisher.
    pub fn record_published(&self, count: u64) {
        self.samples_published.fetch_add(count, Ordering::Relaxed);
    }

    /// Record samples the Publisher could not accept.
    pub fn record_publish_failure(&self, count: u64) {
        self.publish_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Record tag value observations.
    pub fn record_reads(&self, count: u64) {
        self.reads.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one stored external write.
    pub fn record_write_applied(&self) {
        self.writes_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one ignored external write.
    pub fn record_write_ignored(&self) {
        self.writes_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one rejected external write.
    pub fn record_write_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters into an owned snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            samples_published: self.samples_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes_applied: self.writes_applied.load(Ordering::Relaxed),
            writes_ignored: self.writes_ignored.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters, suitable for logging or
/// serializing to a diagnostics consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Completed ticks.
    pub ticks: u64,
    /// Samples handed to the Publisher.
    pub samples_published: u64,
    /// Samples the Publisher could not accept.
    pub publish_failures: u64,
    /// Tag value observations.
    pub reads: u64,
    /// External writes that were stored.
    pub writes_applied: u64,
    /// External writes silently ignored.
    pub writes_ignored: u64,
    /// External writes rejected.
    pub writes_rejected: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let metrics = SimulatorMetrics::default();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_published(4);
        metrics.record_publish_failure(1);
        metrics.record_reads(4);
        metrics.record_write_applied();
        metrics.record_write_ignored();
        metrics.record_write_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.samples_published, 4);
        assert_eq!(snapshot.publish_failures, 1);
        assert_eq!(snapshot.reads, 4);
        assert_eq!(snapshot.writes_applied, 1);
        assert_eq!(snapshot.writes_ignored, 1);
        assert_eq!(snapshot.writes_rejected, 1);
    }

    #[test]
    fn snapshot_starts_at_zero() {
        let metrics = SimulatorMetrics::default();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
