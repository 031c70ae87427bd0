//! Minimal human-readable formatting.

use std::fmt::Write;

use crate::format::{EventFormatter, TimeStyle};
use crate::record::{Record, RecordKind};

/// Formats records as `message {time: '…', sev: '…', …, track-id: '…'}`.
/// Optional fields are omitted when absent.
#[derive(Debug, Clone)]
pub struct SimpleFormatter {
    time: TimeStyle,
    separator: String,
}

impl SimpleFormatter {
    pub fn new(time: TimeStyle) -> Self {
        Self {
            time,
            separator: ", ".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    fn field(&self, out: &mut String, key: &str, value: impl std::fmt::Display) {
        let _ = write!(out, "{key}: '{value}'{}", self.separator);
    }
}

impl Default for SimpleFormatter {
    fn default() -> Self {
        Self::new(TimeStyle::default())
    }
}

impl EventFormatter for SimpleFormatter {
    fn format(&self, record: &Record) -> String {
        let mut out = String::with_capacity(256);
        if !record.message.is_empty() {
            out.push_str(&record.message);
            out.push(' ');
        }
        out.push('{');

        let kind = match record.kind {
            RecordKind::Event => "EVENT",
            RecordKind::Activity => "ACTIVITY",
        };
        self.field(&mut out, "time", self.time.render(&record.timestamp));
        self.field(&mut out, "sev", record.severity);
        self.field(&mut out, "type", kind);
        self.field(&mut out, "name", &record.name);
        self.field(&mut out, "source", &record.source);
        if let Some(elapsed) = record.elapsed_usec.filter(|v| *v != 0) {
            self.field(&mut out, "usec", elapsed);
        }
        if let Some(wait) = record.wait_usec.filter(|v| *v != 0) {
            self.field(&mut out, "wait.usec", wait);
        }
        if let Some(start) = &record.start_time {
            self.field(&mut out, "start.time", self.time.render(start));
        }
        if let Some(end) = &record.end_time {
            self.field(&mut out, "end.time", self.time.render(end));
        }
        if let Some(corr) = &record.correlator {
            self.field(&mut out, "corr-id", corr);
        }
        if let Some(parent) = &record.parent_id {
            self.field(&mut out, "parent-id", parent);
        }
        let _ = write!(out, "track-id: '{}'}}", record.tracking_id);
        out
    }
}
