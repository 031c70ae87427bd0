//! Precision time subsystem.
//!
//! # Responsibilities
//! - Stamp records with microsecond-accurate timestamps
//! - Carry/borrow-correct arithmetic for elapsed and wait times
//! - Format and parse timestamps with up to six fractional-second digits
//!
//! # Data Flow
//! ```text
//! text + pattern + zone
//!     → pattern.rs (SimpleDateFormat letters → chrono strftime)
//!     → timestamp.rs (splice fraction, parse milliseconds, add microseconds)
//!     → PrecisionTimestamp
//! ```

mod pattern;
mod timestamp;

pub use timestamp::{PrecisionTimestamp, TimestampError, Zone, DEFAULT_PATTERN};
