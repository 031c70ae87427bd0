//! Application-facing facade over the gate and the delivery engine.

use std::sync::Arc;

use crate::delivery::{DeliveryEngine, DeliveryError};
use crate::gate::DeliveryGate;
use crate::record::{Record, Severity};
use crate::time::PrecisionTimestamp;

/// Emits records for one source.
///
/// Every call consults the gate first; gated-out calls build nothing and
/// return `Ok(false)`.
#[derive(Debug, Clone)]
pub struct Tracker {
    source: String,
    gate: DeliveryGate,
    engine: Arc<DeliveryEngine>,
}

/// A unit of work whose timing is reported when it finishes.
#[derive(Debug, Clone)]
pub struct Activity {
    name: String,
    start: PrecisionTimestamp,
    correlator: Option<String>,
}

impl Activity {
    pub fn with_correlator(mut self, correlator: impl Into<String>) -> Self {
        self.correlator = Some(correlator.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> PrecisionTimestamp {
        self.start
    }
}

impl Tracker {
    pub fn new(source: impl Into<String>, gate: DeliveryGate, engine: Arc<DeliveryEngine>) -> Self {
        Self {
            source: source.into(),
            gate,
            engine,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn gate(&self) -> &DeliveryGate {
        &self.gate
    }

    pub fn engine(&self) -> &Arc<DeliveryEngine> {
        &self.engine
    }

    /// Whether a record of `severity` from this source would be submitted.
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.gate.allow(&self.source, severity)
    }

    /// Submit an event. Returns `Ok(false)` when the gate filtered it out.
    pub async fn track(
        &self,
        severity: Severity,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<bool, DeliveryError> {
        if !self.is_enabled(severity) {
            return Ok(false);
        }
        let record = Record::event(self.source.clone(), severity, name).with_message(message);
        self.engine.submit(record).await?;
        Ok(true)
    }

    /// Start timing an activity.
    pub fn begin(&self, name: impl Into<String>) -> Activity {
        Activity {
            name: name.into(),
            start: PrecisionTimestamp::now(),
            correlator: None,
        }
    }

    /// Finish `activity` now and submit it with its elapsed time.
    pub async fn finish(
        &self,
        activity: Activity,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<bool, DeliveryError> {
        let end = PrecisionTimestamp::now().max(activity.start);
        self.activity(severity, activity, end, message).await
    }

    /// Submit `activity` as ending at `end`.
    pub async fn activity(
        &self,
        severity: Severity,
        activity: Activity,
        end: PrecisionTimestamp,
        message: impl Into<String>,
    ) -> Result<bool, DeliveryError> {
        if !self.is_enabled(severity) {
            return Ok(false);
        }
        let mut record = Record::activity(self.source.clone(), severity, activity.name)
            .with_span(activity.start, end)
            .with_message(message);
        if let Some(correlator) = activity.correlator {
            record = record.with_correlator(correlator);
        }
        self.engine.submit(record).await?;
        Ok(true)
    }

    /// Submit a caller-built record, subject to the gate for its own source.
    pub async fn submit(&self, record: Record) -> Result<bool, DeliveryError> {
        if !self.gate.allow(&record.source, record.severity) {
            return Ok(false);
        }
        self.engine.submit(record).await?;
        Ok(true)
    }
}
