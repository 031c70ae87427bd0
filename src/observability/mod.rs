//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine, workers, gate, config:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr log output, filtered by RUST_LOG or config
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (worker id, failure count) instead of formatted strings
//! - Metrics are cheap (atomic increments) and no-ops when no recorder is installed
//! - Log output never shares stdout with the console sink

pub mod logging;
pub mod metrics;
