//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     DeliveryEngine::shutdown → drain deadline passes → Shutdown::trigger
//!     → every worker's ShutdownSignal resolves → workers exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → CLI stops reading input → engine shutdown
//! ```
//!
//! # Design Decisions
//! - The shutdown flag is level-triggered: late subscribers still observe it
//! - Ordered shutdown: stop accepting, drain, stop workers, close sink
//! - Shutdown has timeout: queued records are discarded after the deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
