//! Event relay: gated, timestamped records delivered asynchronously to
//! pluggable sinks.
//!
//! # Architecture Overview
//!
//! ```text
//!   application
//!       │  Tracker::track / activity
//!       ▼
//!   ┌──────────┐  allow(source, severity)   ┌──────────────────┐
//!   │ Tracker  │───────────────────────────▶│ gate             │
//!   └────┬─────┘                            │ token repository │
//!        │ Record (PrecisionTimestamp)      └──────────────────┘
//!        ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ delivery::DeliveryEngine                      │
//!   │   queue (bounded, FIFO) ──▶ worker pool ──────┼──▶ sink (console / file)
//!   │   overflow policy          supervisor         │      └─ format (simple / json)
//!   └──────────────────────────────────────────────┘
//!
//!   cross-cutting: config, lifecycle, observability, resilience, time
//! ```

pub mod config;
pub mod delivery;
pub mod format;
pub mod gate;
pub mod lifecycle;
pub mod observability;
pub mod record;
pub mod resilience;
pub mod sink;
pub mod time;
pub mod tracker;

pub use config::RelayConfig;
pub use delivery::{DeliveryEngine, DeliveryError};
pub use gate::DeliveryGate;
pub use record::{Record, Severity};
pub use sink::EventSink;
pub use time::PrecisionTimestamp;
pub use tracker::Tracker;
