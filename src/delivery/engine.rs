//! Pooled delivery engine.
//!
//! # Responsibilities
//! - Own the queue, the worker pool, the sink and the counters
//! - Enforce the lifecycle: Created → Running → Draining → Stopped
//! - Apply the overflow policy on submit
//! - Drain with a deadline on shutdown, then flush and close the sink

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::{EngineConfig, OverflowPolicy};
use crate::delivery::queue::{DeliveryQueue, PushError};
use crate::delivery::stats::{DeliveryStats, StatsSnapshot};
use crate::delivery::worker::{FailurePolicy, Supervisor, WorkerContext};
use crate::delivery::DeliveryError;
use crate::lifecycle::Shutdown;
use crate::record::Record;
use crate::sink::EventSink;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EngineState {
    Created = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => EngineState::Created,
            1 => EngineState::Running,
            2 => EngineState::Draining,
            _ => EngineState::Stopped,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Created => "created",
            EngineState::Running => "running",
            EngineState::Draining => "draining",
            EngineState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Outcome of [`DeliveryEngine::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// The queue emptied before the drain deadline.
    pub drained: bool,
    /// Records discarded by this shutdown call.
    pub discarded: u64,
    /// Counters after the engine stopped.
    pub stats: StatsSnapshot,
}

/// Bounded queue plus worker pool in front of one [`EventSink`].
pub struct DeliveryEngine {
    config: EngineConfig,
    queue: Arc<DeliveryQueue<Record>>,
    sink: Arc<dyn EventSink>,
    stats: Arc<DeliveryStats>,
    active: Arc<AtomicUsize>,
    shutdown: Arc<Shutdown>,
    state: AtomicU8,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryEngine {
    pub fn new(config: EngineConfig, sink: Arc<dyn EventSink>) -> Self {
        let queue = Arc::new(DeliveryQueue::new(config.queue_capacity));
        Self {
            config,
            queue,
            sink,
            stats: Arc::new(DeliveryStats::new()),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(Shutdown::new()),
            state: AtomicU8::new(EngineState::Created as u8),
            supervisor: Mutex::new(None),
        }
    }

    /// Spawn the worker pool. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), DeliveryError> {
        self.transition(EngineState::Created, EngineState::Running)
            .map_err(|_| DeliveryError::AlreadyStarted)?;

        let ctx = Arc::new(WorkerContext {
            queue: self.queue.clone(),
            sink: self.sink.clone(),
            stats: self.stats.clone(),
            active: self.active.clone(),
            policy: FailurePolicy {
                threshold: self.config.failure_threshold,
                retries: self.config.delivery_retries,
                retry_backoff_ms: self.config.retry_backoff_ms,
                recycle_backoff_base_ms: self.config.recycle_backoff_base_ms,
                recycle_backoff_max_ms: self.config.recycle_backoff_max_ms,
            },
        });
        let supervisor = Supervisor::new(ctx, self.shutdown.clone(), self.config.pool_size);
        *self.supervisor.lock() = Some(tokio::spawn(supervisor.run()));

        tracing::info!(
            pool_size = self.config.pool_size,
            queue_capacity = self.queue.capacity(),
            overflow_policy = ?self.config.overflow_policy,
            "Delivery engine started"
        );
        Ok(())
    }

    /// Enqueue a record, applying the overflow policy when the queue is full.
    pub async fn submit(&self, record: Record) -> Result<(), DeliveryError> {
        let record = match self.enqueue(record)? {
            None => return Ok(()),
            Some(record) => record,
        };

        match self.config.overflow_policy {
            OverflowPolicy::Reject => {
                self.stats.record_dropped("queue_full");
                tracing::debug!(tracking_id = %record.tracking_id, "Queue full, record rejected");
                Err(DeliveryError::QueueFull)
            }
            OverflowPolicy::Block => {
                match self.queue.push_timeout(record, self.config.submit_timeout()).await {
                    Ok(()) => {
                        self.stats.record_submitted();
                        Ok(())
                    }
                    Err(PushError::Closed(_)) => Err(DeliveryError::EngineClosed),
                    Err(PushError::Full(record)) => {
                        self.stats.record_dropped("timeout");
                        tracing::debug!(tracking_id = %record.tracking_id, "Timed out waiting for queue space");
                        Err(DeliveryError::EnqueueTimeout)
                    }
                }
            }
        }
    }

    /// Enqueue without waiting. A full queue fails with `QueueFull` whatever
    /// the overflow policy.
    pub fn try_submit(&self, record: Record) -> Result<(), DeliveryError> {
        match self.enqueue(record)? {
            None => Ok(()),
            Some(_) => {
                self.stats.record_dropped("queue_full");
                Err(DeliveryError::QueueFull)
            }
        }
    }

    /// `Ok(None)` when enqueued, `Ok(Some(record))` when the queue is full.
    fn enqueue(&self, record: Record) -> Result<Option<Record>, DeliveryError> {
        if self.state() != EngineState::Running {
            return Err(DeliveryError::EngineClosed);
        }
        match self.queue.try_push(record) {
            Ok(()) => {
                self.stats.record_submitted();
                Ok(None)
            }
            Err(PushError::Full(record)) => Ok(Some(record)),
            Err(PushError::Closed(_)) => Err(DeliveryError::EngineClosed),
        }
    }

    /// Stop accepting records, drain for up to `drain_timeout`, discard the
    /// rest, stop the workers, then flush and close the sink.
    ///
    /// Calling this again, or while another call is draining, returns the
    /// current counters without doing anything.
    pub async fn shutdown(&self, drain_timeout: Duration) -> ShutdownReport {
        let started = Instant::now();

        if self.transition(EngineState::Running, EngineState::Draining).is_err() {
            if self.transition(EngineState::Created, EngineState::Stopped).is_ok() {
                self.queue.close();
                self.shutdown.trigger();
                self.sink.close().await;
                tracing::info!("Delivery engine stopped before start");
            }
            return ShutdownReport {
                drained: self.queue.is_empty(),
                discarded: 0,
                stats: self.stats.snapshot(),
            };
        }

        tracing::info!(
            queued = self.queue.len(),
            drain_timeout_ms = drain_timeout.as_millis() as u64,
            "Delivery engine draining"
        );
        self.queue.close();

        let mut drained = true;
        let mut discarded = 0;
        let handle = self.supervisor.lock().take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(drain_timeout, &mut handle).await {
                Ok(joined) => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Worker supervisor failed");
                    }
                }
                Err(_) => {
                    drained = false;
                    self.shutdown.trigger();
                    discarded = self.queue.clear();
                    self.stats.record_discarded(discarded);
                    tracing::warn!(discarded, "Drain deadline passed, discarding queued records");
                    if let Err(e) = handle.await {
                        tracing::error!(error = %e, "Worker supervisor failed");
                    }
                }
            }
        }
        self.shutdown.trigger();

        if let Err(e) = self.sink.flush().await {
            tracing::warn!(error = %e, "Failed to flush sink");
        }
        self.sink.close().await;
        self.state.store(EngineState::Stopped as u8, Ordering::SeqCst);

        let stats = self.stats.snapshot();
        tracing::info!(
            drained,
            discarded,
            delivered = stats.delivered,
            failed = stats.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Delivery engine stopped"
        );

        ShutdownReport {
            drained,
            discarded: discarded as u64,
            stats,
        }
    }

    fn transition(&self, from: EngineState, to: EngineState) -> Result<(), EngineState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(EngineState::from_u8)
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Workers currently running (excludes replacements still backing off).
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for DeliveryEngine {
    fn drop(&mut self) {
        // Release workers of an engine dropped without shutdown.
        self.queue.close();
        self.shutdown.trigger();
    }
}

impl fmt::Debug for DeliveryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryEngine")
            .field("state", &self.state())
            .field("queue_len", &self.queue.len())
            .field("active_workers", &self.active_workers())
            .finish()
    }
}
