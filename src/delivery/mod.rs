//! Asynchronous delivery subsystem.
//!
//! # Data Flow
//! ```text
//! DeliveryEngine::submit(record)
//!     → queue.rs (bounded FIFO; overflow policy applies when full)
//!     → worker.rs (pool of workers pulling from the shared queue)
//!     → EventSink::log(record)
//!     → stats.rs (delivered / failed / skipped counters)
//!
//! DeliveryEngine::shutdown(drain_timeout)
//!     → queue closed (submissions fail with EngineClosed)
//!     → workers drain until empty or deadline
//!     → remainder discarded, workers signalled
//!     → sink flushed and closed
//! ```
//!
//! # Design Decisions
//! - Producers never wait on sink I/O, only (optionally) on queue space
//! - Sink errors stay inside the worker; submitters only see queue outcomes
//! - Global delivery order is only guaranteed with a single worker

pub mod engine;
pub mod queue;
pub mod stats;
pub(crate) mod worker;

pub use crate::config::OverflowPolicy;
pub use engine::{DeliveryEngine, EngineState, ShutdownReport};
pub use queue::{DeliveryQueue, PushError};
pub use stats::{DeliveryStats, StatsSnapshot};

use thiserror::Error;

/// Errors returned to callers submitting records or driving the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery queue is full")]
    QueueFull,
    #[error("timed out waiting for queue space")]
    EnqueueTimeout,
    #[error("delivery engine is not accepting records")]
    EngineClosed,
    #[error("delivery engine was already started")]
    AlreadyStarted,
}
