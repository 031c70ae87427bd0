//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → engine, gate, sink and observability setup
//!
//! Token file changes (gate.watch = true):
//!     watcher.rs detects change
//!     → FileTokenRepository::reload
//!     → atomic swap of the token table
//!     → gate observes new thresholds on the next lookup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the token table hot-reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    EngineConfig, FormatKind, GateConfig, ObservabilityConfig, OverflowPolicy, RelayConfig,
    SinkConfig, SinkKind, TimestampConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::TokenWatcher;
