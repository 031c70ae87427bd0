//! Console sink.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::format::EventFormatter;
use crate::record::{Record, Severity};
use crate::sink::{EventSink, SinkError};

/// Writes one formatted line per record to stdout or an injected writer.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
    formatter: Box<dyn EventFormatter>,
    threshold: Severity,
    closed: AtomicBool,
}

impl ConsoleSink {
    pub fn stdout(formatter: Box<dyn EventFormatter>, threshold: Severity) -> Self {
        Self::with_writer(Box::new(io::stdout()), formatter, threshold)
    }

    pub fn with_writer(
        out: Box<dyn Write + Send>,
        formatter: Box<dyn EventFormatter>,
        threshold: Severity,
    ) -> Self {
        Self {
            out: Mutex::new(out),
            formatter,
            threshold,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventSink for ConsoleSink {
    async fn log(&self, record: &Record) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
        let line = self.formatter.format(record);
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        Ok(())
    }

    fn is_enabled_for(&self, severity: Severity) -> bool {
        severity >= self.threshold
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.out.lock().flush()?;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.out.lock().flush();
    }
}
