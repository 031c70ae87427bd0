//! Delivery gate subsystem.
//!
//! # Data Flow
//! ```text
//! Tracker::track(severity, …)
//!     → selector.rs: DeliveryGate::allow(source, severity)
//!     → repository.rs: TokenRepository::lookup(source) → threshold
//!     → severity >= threshold (or default threshold) ? build + submit : skip
//!
//! On token file change:
//!     config::watcher detects change
//!     → FileTokenRepository::reload()
//!     → atomic swap of the token table
//! ```

pub mod repository;
pub mod selector;

pub use repository::{FileTokenRepository, InMemoryTokenRepository, RepositoryError, TokenRepository};
pub use selector::DeliveryGate;
