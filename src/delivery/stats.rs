//! Engine-owned delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::observability::metrics;

/// Process-wide delivery counters.
///
/// Every update is a relaxed atomic increment mirrored to the metrics
/// facade, so reading a snapshot never touches the delivery path.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    discarded: AtomicU64,
    recycled: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Records accepted into the queue.
    pub submitted: u64,
    /// Records the sink accepted.
    pub delivered: u64,
    /// Records refused at submit because the queue stayed full.
    pub dropped: u64,
    /// Records the sink failed on (after retries) or lost to a worker panic.
    pub failed: u64,
    /// Records the sink was not enabled for.
    pub skipped: u64,
    /// Records still queued when the drain deadline passed.
    pub discarded: u64,
    /// Workers replaced by the supervisor.
    pub recycled: u64,
}

impl StatsSnapshot {
    /// Records that left the queue one way or another.
    pub fn settled(&self) -> u64 {
        self.delivered + self.failed + self.skipped + self.discarded
    }
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        metrics::record_submitted();
    }

    pub(crate) fn record_delivered(&self, start: Instant) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        metrics::record_delivered(start);
    }

    pub(crate) fn record_dropped(&self, reason: &'static str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::record_dropped(reason);
    }

    /// Returns the failure count including this one.
    pub(crate) fn record_failed(&self, start: Instant) -> u64 {
        metrics::record_failure(start);
        self.failed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        metrics::record_skipped();
    }

    pub(crate) fn record_discarded(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
        metrics::record_discarded(count);
    }

    pub(crate) fn record_recycled(&self, cause: &'static str) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
        metrics::record_recycled(cause);
    }
}
