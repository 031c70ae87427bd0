//! Event sink subsystem.
//!
//! # Data Flow
//! ```text
//! delivery worker
//!     → EventSink::is_enabled_for(severity)
//!     → EventSink::log(record)
//!         → EventFormatter::format(record)
//!         → backend (console.rs, file.rs)
//! ```
//!
//! Sinks are selected by configuration (`factory.rs`) and shared by all
//! workers as `Arc<dyn EventSink>`, so implementations must tolerate
//! concurrent calls.

pub mod console;
pub mod factory;
pub mod file;

pub use console::ConsoleSink;
pub use factory::build_sink;
pub use file::FileSink;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{Record, Severity};

/// Error type for sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink is closed")]
    Closed,
    #[error("sink rejected record: {0}")]
    Rejected(String),
    #[error("sink configuration error: {0}")]
    Config(String),
}

/// A backend that records or forwards delivered records.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one record.
    async fn log(&self, record: &Record) -> Result<(), SinkError>;

    /// Whether records of `severity` should be delivered at all.
    fn is_enabled_for(&self, severity: Severity) -> bool;

    /// Push buffered output to the backend.
    async fn flush(&self) -> Result<(), SinkError>;

    /// Release backend resources. Later `log` calls fail with [`SinkError::Closed`].
    async fn close(&self);
}
