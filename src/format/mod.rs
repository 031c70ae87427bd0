//! Record formatting.
//!
//! Sinks turn records into text through an [`EventFormatter`]:
//! - `simple.rs`: `message {key: 'value', …}` lines for humans
//! - `json.rs`: one JSON object per line for machines

pub mod json;
pub mod simple;

pub use json::JsonFormatter;
pub use simple::SimpleFormatter;

use crate::record::Record;
use crate::time::{PrecisionTimestamp, Zone};

/// Turns a record into a single line of text.
pub trait EventFormatter: Send + Sync {
    fn format(&self, record: &Record) -> String;
}

/// How timestamps are rendered inside formatted output.
#[derive(Debug, Clone, Default)]
pub struct TimeStyle {
    pub pattern: Option<String>,
    pub zone: Zone,
}

impl TimeStyle {
    pub fn new(pattern: Option<String>, zone: Zone) -> Self {
        Self { pattern, zone }
    }

    pub fn render(&self, ts: &PrecisionTimestamp) -> String {
        ts.format(self.pattern.as_deref(), Some(self.zone))
            .unwrap_or_else(|_| ts.total_micros().to_string())
    }
}
