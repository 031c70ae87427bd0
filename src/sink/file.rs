//! Append-only file sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::format::EventFormatter;
use crate::record::{Record, Severity};
use crate::sink::{EventSink, SinkError};

/// Appends one formatted line per record to a file.
///
/// Output is buffered; it reaches the file on `flush`, `close`, or when the
/// buffer fills.
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    formatter: Box<dyn EventFormatter>,
    threshold: Severity,
}

impl FileSink {
    /// Open (creating if needed) `path` for appending.
    pub async fn open(
        path: &Path,
        formatter: Box<dyn EventFormatter>,
        threshold: Severity,
    ) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        tracing::info!(path = ?path, "File sink opened");

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Some(BufWriter::new(file))),
            formatter,
            threshold,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSink for FileSink {
    async fn log(&self, record: &Record) -> Result<(), SinkError> {
        let mut line = self.formatter.format(record);
        line.push('\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    fn is_enabled_for(&self, severity: Severity) -> bool {
        severity >= self.threshold
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::warn!(path = ?self.path, error = %e, "Failed to close file sink");
            }
        }
    }
}
