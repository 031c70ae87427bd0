//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool size, capacity, backoff bounds)
//! - Check cross-field requirements (file sink needs a path, watch needs a token file)
//! - Verify timestamp patterns and zone ids before any record is formatted
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::{OverflowPolicy, RelayConfig, SinkKind};
use crate::time::{PrecisionTimestamp, Zone};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `engine.pool_size`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let engine = &config.engine;
    if engine.pool_size == 0 {
        errors.push(ValidationError::new("engine.pool_size", "must be at least 1"));
    }
    if engine.queue_capacity == 0 {
        errors.push(ValidationError::new("engine.queue_capacity", "must be at least 1"));
    }
    if engine.overflow_policy == OverflowPolicy::Block && engine.submit_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "engine.submit_timeout_ms",
            "must be positive when overflow_policy is \"block\"",
        ));
    }
    if engine.recycle_backoff_base_ms > engine.recycle_backoff_max_ms {
        errors.push(ValidationError::new(
            "engine.recycle_backoff_base_ms",
            "must not exceed recycle_backoff_max_ms",
        ));
    }

    if config.gate.watch && config.gate.token_file.is_none() {
        errors.push(ValidationError::new("gate.watch", "requires gate.token_file"));
    }

    if config.sink.kind == SinkKind::File && config.sink.path.is_none() {
        errors.push(ValidationError::new("sink.path", "required for file sinks"));
    }

    let zone = match config.timestamp.timezone.as_deref() {
        Some(id) => match Zone::parse(id) {
            Ok(zone) => Some(zone),
            Err(e) => {
                errors.push(ValidationError::new("timestamp.timezone", e.to_string()));
                None
            }
        },
        None => Some(Zone::Local),
    };
    if let (Some(pattern), Some(zone)) = (config.timestamp.pattern.as_deref(), zone) {
        if let Err(e) = PrecisionTimestamp::now().format(Some(pattern), Some(zone)) {
            errors.push(ValidationError::new("timestamp.pattern", e.to_string()));
        }
    }

    let obs = &config.observability;
    if let Err(e) = EnvFilter::try_new(&obs.log_level) {
        errors.push(ValidationError::new("observability.log_level", e.to_string()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(config: &RelayConfig) -> Vec<&'static str> {
        validate_config(config)
            .err()
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RelayConfig::default();
        config.engine.pool_size = 0;
        config.engine.recycle_backoff_base_ms = 10_000;
        config.sink.kind = SinkKind::File;
        config.gate.watch = true;

        assert_eq!(
            fields(&config),
            vec![
                "engine.pool_size",
                "engine.recycle_backoff_base_ms",
                "gate.watch",
                "sink.path",
            ]
        );
    }

    #[test]
    fn test_zero_timeout_allowed_only_for_reject() {
        let mut config = RelayConfig::default();
        config.engine.submit_timeout_ms = 0;
        assert_eq!(fields(&config), vec!["engine.submit_timeout_ms"]);

        config.engine.overflow_policy = OverflowPolicy::Reject;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_timestamp_settings() {
        let mut config = RelayConfig::default();
        config.timestamp.timezone = Some("Mars/Olympus".into());
        assert_eq!(fields(&config), vec!["timestamp.timezone"]);

        config.timestamp.timezone = Some("UTC".into());
        config.timestamp.pattern = Some("yyyy-MM-dd Q".into());
        assert_eq!(fields(&config), vec!["timestamp.pattern"]);
    }

    #[test]
    fn test_metrics_address_checked_when_enabled() {
        let mut config = RelayConfig::default();
        config.observability.metrics_address = "not-an-address".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(fields(&config), vec!["observability.metrics_address"]);
    }
}
