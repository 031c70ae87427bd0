//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Delivery attempt fails:
//!     → backoff.rs (delay before the next attempt, if retries remain)
//!
//! Worker recycled after repeated failures:
//!     → backoff.rs (delay before the replacement starts pulling records)
//! ```
//!
//! # Design Decisions
//! - Delays grow exponentially and are capped
//! - Jitter spreads out replacements that fail together

pub mod backoff;

pub use backoff::calculate_backoff;
