//! Delivery workers and their supervisor.
//!
//! # Responsibilities
//! - Pull records from the shared queue and hand them to the sink
//! - Contain sink failures to the record that caused them
//! - Recycle workers that keep failing, and replace workers that panic
//!
//! # Data Flow
//! ```text
//! Supervisor
//!     → spawns pool_size workers
//!     → worker exits with Recycle, or panics
//!         → replacement waits calculate_backoff(restarts)
//!         → replacement joins the pool
//!     → worker exits with Drained/Stopped → slot retired
//!
//! Worker
//!     → queue.pop() (cancelled by the shutdown signal)
//!     → sink.is_enabled_for(severity)? → sink.log(record) with retries
//!     → count delivered / failed / skipped
//! ```
//!
//! # Design Decisions
//! - A record is the unit of failure: one bad record never stops the worker
//! - Consecutive failures past the threshold mean the worker is degraded;
//!   it exits and the supervisor starts a fresh one after a backoff
//! - The shutdown signal is only observed between deliveries, never mid-call

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{JoinError, JoinSet};

use crate::delivery::queue::DeliveryQueue;
use crate::delivery::stats::DeliveryStats;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::record::Record;
use crate::resilience::calculate_backoff;
use crate::sink::{EventSink, SinkError};

/// Failure handling knobs shared by every worker.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailurePolicy {
    /// Consecutive failures before recycling; 0 never recycles.
    pub threshold: u32,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub recycle_backoff_base_ms: u64,
    pub recycle_backoff_max_ms: u64,
}

/// State shared by the supervisor and all workers.
pub(crate) struct WorkerContext {
    pub queue: Arc<DeliveryQueue<Record>>,
    pub sink: Arc<dyn EventSink>,
    pub stats: Arc<DeliveryStats>,
    pub active: Arc<AtomicUsize>,
    pub policy: FailurePolicy,
}

/// Why a worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// Queue closed and empty.
    Drained,
    /// Shutdown signal observed.
    Stopped,
    /// Too many consecutive failures. `delivered` is how many records this
    /// worker delivered before degrading.
    Recycle { delivered: u64 },
}

/// Keeps the live-worker gauge honest even when a worker panics.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active.clone())
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run one worker until the queue drains, shutdown fires, or it degrades.
pub(crate) async fn run_worker(id: usize, ctx: Arc<WorkerContext>, mut stop: ShutdownSignal) -> WorkerExit {
    let _active = ActiveGuard::enter(&ctx.active);
    let mut consecutive: u32 = 0;
    let mut delivered: u64 = 0;

    tracing::debug!(worker = id, "Worker started");

    loop {
        let record = tokio::select! {
            biased;
            _ = stop.recv() => {
                tracing::debug!(worker = id, "Worker stopped");
                return WorkerExit::Stopped;
            }
            next = ctx.queue.pop() => match next {
                Some(record) => record,
                None => {
                    tracing::debug!(worker = id, delivered, "Worker drained");
                    return WorkerExit::Drained;
                }
            },
        };
        metrics::record_queue_depth(ctx.queue.len());

        if !ctx.sink.is_enabled_for(record.severity) {
            ctx.stats.record_skipped();
            continue;
        }

        let start = Instant::now();
        match deliver(&ctx, &record, &mut stop).await {
            Ok(()) => {
                consecutive = 0;
                delivered += 1;
                ctx.stats.record_delivered(start);
            }
            Err(e) => {
                consecutive += 1;
                let failure_count = ctx.stats.record_failed(start);
                tracing::warn!(
                    worker = id,
                    tracking_id = %record.tracking_id,
                    error = %e,
                    failure_count,
                    consecutive,
                    "Delivery failed"
                );

                let threshold = ctx.policy.threshold;
                if threshold > 0 && consecutive >= threshold {
                    tracing::warn!(worker = id, consecutive, threshold, "Worker degraded, requesting recycle");
                    return WorkerExit::Recycle { delivered };
                }
            }
        }
    }
}

/// Hand one record to the sink, retrying with backoff. A shutdown signal
/// during a retry delay abandons the remaining attempts.
async fn deliver(ctx: &WorkerContext, record: &Record, stop: &mut ShutdownSignal) -> Result<(), SinkError> {
    let policy = ctx.policy;
    let mut attempt = 0;

    loop {
        let err = match ctx.sink.log(record).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if attempt >= policy.retries {
            return Err(err);
        }
        attempt += 1;

        let delay = calculate_backoff(attempt, policy.retry_backoff_ms, policy.retry_backoff_ms.saturating_mul(32));
        tracing::debug!(tracking_id = %record.tracking_id, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying delivery");
        tokio::select! {
            biased;
            _ = stop.recv() => return Err(err),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Keeps `pool_size` workers running until the pool drains or stops.
pub(crate) struct Supervisor {
    ctx: Arc<WorkerContext>,
    shutdown: Arc<Shutdown>,
    pool_size: usize,
    next_id: usize,
    /// Consecutive restarts per slot, for backoff.
    restarts: Vec<u32>,
}

type SlotOutcome = (usize, Result<WorkerExit, JoinError>);

impl Supervisor {
    pub(crate) fn new(ctx: Arc<WorkerContext>, shutdown: Arc<Shutdown>, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            ctx,
            shutdown,
            pool_size,
            next_id: 0,
            restarts: vec![0; pool_size],
        }
    }

    /// Spawn the pool and supervise it. Returns once every worker has exited
    /// and no replacement is due.
    pub(crate) async fn run(mut self) {
        let mut workers: JoinSet<SlotOutcome> = JoinSet::new();
        for slot in 0..self.pool_size {
            self.spawn(&mut workers, slot, Duration::ZERO);
        }
        tracing::info!(workers = self.pool_size, "Worker pool started");

        while let Some(joined) = workers.join_next().await {
            let (slot, outcome) = match joined {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(error = %e, "Worker slot task failed");
                    continue;
                }
            };

            let cause = match outcome {
                Ok(WorkerExit::Drained) | Ok(WorkerExit::Stopped) => continue,
                Ok(WorkerExit::Recycle { delivered }) => {
                    self.restarts[slot] = if delivered > 0 { 1 } else { self.restarts[slot].saturating_add(1) };
                    "failures"
                }
                Err(e) if e.is_panic() => {
                    // The in-flight record is lost with the worker.
                    let failure_count = self.ctx.stats.record_failed(Instant::now());
                    tracing::error!(slot, failure_count, "Worker panicked during delivery");
                    self.restarts[slot] = self.restarts[slot].saturating_add(1);
                    "panic"
                }
                Err(e) => {
                    tracing::warn!(slot, error = %e, "Worker cancelled");
                    continue;
                }
            };

            if self.shutdown.is_triggered() || (self.ctx.queue.is_closed() && self.ctx.queue.is_empty()) {
                tracing::debug!(slot, cause, "Worker not replaced, pool is stopping");
                continue;
            }

            self.ctx.stats.record_recycled(cause);
            let policy = self.ctx.policy;
            let delay = calculate_backoff(
                self.restarts[slot],
                policy.recycle_backoff_base_ms,
                policy.recycle_backoff_max_ms,
            );
            tracing::info!(slot, cause, delay_ms = delay.as_millis() as u64, "Replacing worker");
            self.spawn(&mut workers, slot, delay);
        }

        tracing::info!("Worker pool stopped");
    }

    fn spawn(&mut self, workers: &mut JoinSet<SlotOutcome>, slot: usize, delay: Duration) {
        let id = self.next_id;
        self.next_id += 1;

        let ctx = self.ctx.clone();
        let mut stop = self.shutdown.subscribe();

        // The worker runs in its own task so a panic surfaces as a JoinError
        // while the slot number survives.
        workers.spawn(async move {
            let outcome = tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = stop.recv() => return WorkerExit::Stopped,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                run_worker(id, ctx, stop).await
            })
            .await;
            (slot, outcome)
        });
    }
}
