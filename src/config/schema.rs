//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::record::Severity;

/// Root configuration for the event relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Delivery engine: queue, worker pool, overflow and failure policy.
    pub engine: EngineConfig,

    /// Conditional delivery gate.
    pub gate: GateConfig,

    /// Backend the engine delivers to.
    pub sink: SinkConfig,

    /// Timestamp rendering in formatted output.
    pub timestamp: TimestampConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Behaviour of `submit` when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Wait up to `submit_timeout_ms` for a free slot.
    Block,
    /// Fail immediately and count the record as dropped.
    Reject,
}

/// Delivery engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of delivery workers.
    pub pool_size: usize,

    /// Maximum number of buffered records.
    pub queue_capacity: usize,

    /// What `submit` does when the queue is full.
    pub overflow_policy: OverflowPolicy,

    /// Maximum time a blocked `submit` waits, in milliseconds.
    pub submit_timeout_ms: u64,

    /// Maximum time shutdown waits for the queue to drain, in milliseconds.
    pub drain_timeout_ms: u64,

    /// Consecutive delivery failures before a worker is recycled (0 = never).
    pub failure_threshold: u32,

    /// Base delay before a recycled worker restarts, in milliseconds.
    pub recycle_backoff_base_ms: u64,

    /// Maximum delay before a recycled worker restarts, in milliseconds.
    pub recycle_backoff_max_ms: u64,

    /// Extra delivery attempts per record before it counts as failed.
    pub delivery_retries: u32,

    /// Base delay between delivery attempts, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl EngineConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            queue_capacity: 10_000,
            overflow_policy: OverflowPolicy::Block,
            submit_timeout_ms: 1000,
            drain_timeout_ms: 5000,
            failure_threshold: 10,
            recycle_backoff_base_ms: 100,
            recycle_backoff_max_ms: 5000,
            delivery_retries: 0,
            retry_backoff_ms: 50,
        }
    }
}

/// Delivery gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Threshold for sources without a token; `"none"` (`None`) denies them.
    #[serde(with = "optional_threshold")]
    pub default_threshold: Option<Severity>,

    /// TOML file holding `[tokens]` (source key → minimum severity).
    pub token_file: Option<PathBuf>,

    /// Reload the token file when it changes.
    pub watch: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_threshold: Some(Severity::Info),
            token_file: None,
            watch: false,
        }
    }
}

/// A severity name, or `none` for no threshold.
mod optional_threshold {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::record::Severity;

    const NONE: &str = "none";

    pub fn serialize<S: Serializer>(value: &Option<Severity>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map_or(NONE, |sev| sev.as_str()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Severity>, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.trim().eq_ignore_ascii_case(NONE) {
            return Ok(None);
        }
        text.parse().map(Some).map_err(de::Error::custom)
    }
}

/// Backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Console,
    File,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Simple,
    Json,
}

/// Sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,

    /// Output path, required for `file` sinks.
    pub path: Option<PathBuf>,

    pub format: FormatKind,

    /// Records below this severity are skipped by the sink.
    pub threshold: Severity,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Console,
            path: None,
            format: FormatKind::Simple,
            threshold: Severity::Trace,
        }
    }
}

/// Timestamp rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimestampConfig {
    /// Date pattern (e.g. `yyyy-MM-dd HH:mm:ss.SSSSSS`); default when unset.
    pub pattern: Option<String>,

    /// IANA zone id or `local`; system zone when unset.
    pub timezone: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
