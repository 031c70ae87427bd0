//! JSON line formatting.

use serde_json::{json, Value};

use crate::format::{EventFormatter, TimeStyle};
use crate::record::Record;

/// Formats records as a single JSON object, adding a rendered `time` field
/// next to the raw timestamp parts.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    time: TimeStyle,
}

impl JsonFormatter {
    pub fn new(time: TimeStyle) -> Self {
        Self { time }
    }
}

impl EventFormatter for JsonFormatter {
    fn format(&self, record: &Record) -> String {
        let mut value = serde_json::to_value(record).unwrap_or_else(|e| json!({ "error": e.to_string() }));
        if let Value::Object(map) = &mut value {
            map.insert("time".into(), Value::String(self.time.render(&record.timestamp)));
            map.insert("time_usec".into(), json!(record.timestamp.total_micros()));
        }
        value.to_string()
    }
}
