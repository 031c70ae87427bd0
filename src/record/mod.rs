//! Tracking records.
//!
//! A [`Record`] is the unit handed to the delivery engine: an event or an
//! activity, stamped with a [`PrecisionTimestamp`] and identified by a
//! tracking id. Related records are linked through `parent_id` and
//! `correlator`. Records are immutable once submitted.

mod severity;

pub use severity::{Severity, UnknownSeverity};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::PrecisionTimestamp;

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A single point-in-time occurrence.
    Event,
    /// A unit of work with a start and an end.
    Activity,
}

/// An immutable unit of submitted telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordKind,
    pub tracking_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlator: Option<String>,
    pub source: String,
    pub severity: Severity,
    pub name: String,
    pub message: String,
    pub timestamp: PrecisionTimestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<PrecisionTimestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<PrecisionTimestamp>,
    /// Elapsed time of the unit of work, in microseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_usec: Option<i64>,
    /// Time spent waiting (queues, locks, I/O), in microseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_usec: Option<i64>,
}

impl Record {
    /// A new event stamped with the current time and a fresh tracking id.
    pub fn event(source: impl Into<String>, severity: Severity, name: impl Into<String>) -> Self {
        Self::new(RecordKind::Event, source.into(), severity, name.into())
    }

    /// A new activity. Use [`with_span`](Self::with_span) to attach its timing.
    pub fn activity(source: impl Into<String>, severity: Severity, name: impl Into<String>) -> Self {
        Self::new(RecordKind::Activity, source.into(), severity, name.into())
    }

    fn new(kind: RecordKind, source: String, severity: Severity, name: String) -> Self {
        Self {
            kind,
            tracking_id: Uuid::new_v4().to_string(),
            parent_id: None,
            correlator: None,
            source,
            severity,
            name,
            message: String::new(),
            timestamp: PrecisionTimestamp::now(),
            start_time: None,
            end_time: None,
            elapsed_usec: None,
            wait_usec: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_correlator(mut self, correlator: impl Into<String>) -> Self {
        self.correlator = Some(correlator.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: PrecisionTimestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach start/end times; elapsed time is `end - start` in microseconds.
    pub fn with_span(mut self, start: PrecisionTimestamp, end: PrecisionTimestamp) -> Self {
        self.elapsed_usec = Some(end.difference(&start));
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_wait(mut self, wait_usec: i64) -> Self {
        self.wait_usec = Some(wait_usec);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_identity() {
        let a = Record::event("billing", Severity::Info, "charge");
        let b = Record::event("billing", Severity::Info, "charge");
        assert_ne!(a.tracking_id, b.tracking_id);
        assert_eq!(a.kind, RecordKind::Event);
        assert!(a.parent_id.is_none());
    }

    #[test]
    fn test_span_elapsed() {
        let start = PrecisionTimestamp::from_parts(1_000, 900).unwrap();
        let end = PrecisionTimestamp::from_parts(1_002, 100).unwrap();
        let rec = Record::activity("billing", Severity::Info, "batch").with_span(start, end);
        assert_eq!(rec.elapsed_usec, Some(1_200));
        assert_eq!(rec.start_time, Some(start));
    }

    #[test]
    fn test_json_omits_empty_fields() {
        let rec = Record::event("svc", Severity::Warning, "op")
            .with_parent("p-1")
            .with_message("hello");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["severity"], "WARNING");
        assert_eq!(json["parent_id"], "p-1");
        assert!(json.get("correlator").is_none());
        assert!(json.get("elapsed_usec").is_none());
    }
}
