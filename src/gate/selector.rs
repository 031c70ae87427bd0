//! Conditional delivery decisions.

use std::sync::Arc;

use crate::gate::repository::TokenRepository;
use crate::record::Severity;

/// Decides, per source key and severity, whether a record should be built
/// and submitted at all.
#[derive(Clone)]
pub struct DeliveryGate {
    repository: Arc<dyn TokenRepository>,
    default_threshold: Option<Severity>,
}

impl DeliveryGate {
    /// `default_threshold` applies to keys without a token; `None` denies them.
    pub fn new(repository: Arc<dyn TokenRepository>, default_threshold: Option<Severity>) -> Self {
        Self {
            repository,
            default_threshold,
        }
    }

    /// True iff `severity` meets the threshold for `key`.
    pub fn allow(&self, key: &str, severity: Severity) -> bool {
        match self.repository.lookup(key).or(self.default_threshold) {
            Some(threshold) => severity >= threshold,
            None => false,
        }
    }

    /// Enable `key` for records at or above `threshold`.
    pub fn enable(&self, key: &str, threshold: Severity) {
        tracing::debug!(key, %threshold, "Delivery token set");
        self.repository.set(key, threshold);
    }

    /// Drop the token for `key`; it falls back to the default threshold.
    pub fn disable(&self, key: &str) -> bool {
        let removed = self.repository.remove(key).is_some();
        if removed {
            tracing::debug!(key, "Delivery token removed");
        }
        removed
    }

    /// Whether `key` has an explicit token.
    pub fn is_set(&self, key: &str) -> bool {
        self.repository.lookup(key).is_some()
    }

    pub fn default_threshold(&self) -> Option<Severity> {
        self.default_threshold
    }
}

impl std::fmt::Debug for DeliveryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryGate")
            .field("keys", &self.repository.keys())
            .field("default_threshold", &self.default_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::repository::InMemoryTokenRepository;

    fn gate(default: Option<Severity>) -> DeliveryGate {
        let repo = InMemoryTokenRepository::from_tokens([("orders", Severity::Warning)]);
        DeliveryGate::new(Arc::new(repo), default)
    }

    #[test]
    fn test_threshold_from_token() {
        let gate = gate(None);
        assert!(gate.allow("orders", Severity::Warning));
        assert!(gate.allow("orders", Severity::Fatal));
        assert!(!gate.allow("orders", Severity::Info));
    }

    #[test]
    fn test_missing_token_uses_default() {
        assert!(!gate(None).allow("billing", Severity::Halt));

        let gate = gate(Some(Severity::Info));
        assert!(gate.allow("billing", Severity::Info));
        assert!(!gate.allow("billing", Severity::Debug));
    }

    #[test]
    fn test_enable_disable() {
        let gate = gate(None);
        gate.enable("billing", Severity::Debug);
        assert!(gate.is_set("billing"));
        assert!(gate.allow("billing", Severity::Debug));

        assert!(gate.disable("billing"));
        assert!(!gate.disable("billing"));
        assert!(!gate.allow("billing", Severity::Debug));
    }
}
