//! Sink selection from configuration.

use std::sync::Arc;

use crate::config::{FormatKind, SinkConfig, SinkKind, TimestampConfig};
use crate::format::{EventFormatter, JsonFormatter, SimpleFormatter, TimeStyle};
use crate::sink::{ConsoleSink, EventSink, FileSink, SinkError};
use crate::time::Zone;

/// Build the formatter described by `format` and `timestamp`.
pub fn build_formatter(
    format: FormatKind,
    timestamp: &TimestampConfig,
) -> Result<Box<dyn EventFormatter>, SinkError> {
    let zone = match timestamp.timezone.as_deref() {
        Some(id) => Zone::parse(id).map_err(|e| SinkError::Config(e.to_string()))?,
        None => Zone::Local,
    };
    let style = TimeStyle::new(timestamp.pattern.clone(), zone);

    Ok(match format {
        FormatKind::Simple => Box::new(SimpleFormatter::new(style)),
        FormatKind::Json => Box::new(JsonFormatter::new(style)),
    })
}

/// Build the sink described by `config`.
pub async fn build_sink(
    config: &SinkConfig,
    timestamp: &TimestampConfig,
) -> Result<Arc<dyn EventSink>, SinkError> {
    let formatter = build_formatter(config.format, timestamp)?;

    let sink: Arc<dyn EventSink> = match config.kind {
        SinkKind::Console => Arc::new(ConsoleSink::stdout(formatter, config.threshold)),
        SinkKind::File => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| SinkError::Config("file sink requires a path".into()))?;
            Arc::new(FileSink::open(path, formatter, config.threshold).await?)
        }
    };

    tracing::info!(kind = ?config.kind, format = ?config.format, threshold = %config.threshold, "Sink ready");
    Ok(sink)
}
