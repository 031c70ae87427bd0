//! Shared sinks and helpers for integration tests.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use event_relay::config::{EngineConfig, OverflowPolicy};
use event_relay::record::{Record, Severity};
use event_relay::sink::{EventSink, SinkError};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Engine settings with short timeouts and backoffs.
#[allow(dead_code)]
pub fn engine_config(pool_size: usize, queue_capacity: usize, overflow_policy: OverflowPolicy) -> EngineConfig {
    EngineConfig {
        pool_size,
        queue_capacity,
        overflow_policy,
        submit_timeout_ms: 100,
        drain_timeout_ms: 1000,
        recycle_backoff_base_ms: 1,
        recycle_backoff_max_ms: 10,
        retry_backoff_ms: 1,
        ..EngineConfig::default()
    }
}

#[allow(dead_code)]
pub fn record(name: &str) -> Record {
    Record::event("test", Severity::Info, name)
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
#[allow(dead_code)]
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Run `fut` with a generous upper bound so a hang fails the test.
#[allow(dead_code)]
pub async fn bounded<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("operation hung")
}

/// Keeps the names of delivered records in delivery order.
#[derive(Default)]
pub struct RecordingSink {
    names: Mutex<Vec<String>>,
    threshold: Option<Severity>,
    delay: Option<Duration>,
    pub flushed: AtomicBool,
    pub closed: AtomicBool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Only records at or above `threshold` are enabled.
    pub fn with_threshold(threshold: Severity) -> Arc<Self> {
        Arc::new(Self {
            threshold: Some(threshold),
            ..Self::default()
        })
    }

    /// Each delivery takes `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().clone()
    }

    pub fn unique(&self) -> HashSet<String> {
        self.names.lock().iter().cloned().collect()
    }

    fn push(&self, record: &Record) {
        self.names.lock().push(record.name.clone());
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn log(&self, record: &Record) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.push(record);
        Ok(())
    }

    fn is_enabled_for(&self, severity: Severity) -> bool {
        self.threshold.map_or(true, |t| severity >= t)
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.flushed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Fails or panics on chosen calls, records the rest.
pub struct ScriptedSink {
    calls: AtomicUsize,
    fail_calls: Vec<usize>,
    fail_prefix: Option<&'static str>,
    panic_on: Option<&'static str>,
    pub inner: RecordingSink,
}

#[allow(dead_code)]
impl ScriptedSink {
    /// Fail the given 1-based call numbers.
    pub fn failing_calls(calls: &[usize]) -> Arc<Self> {
        Arc::new(Self::build(calls.to_vec(), None, None))
    }

    /// Fail every record whose name starts with `prefix`.
    pub fn failing_prefix(prefix: &'static str) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), Some(prefix), None))
    }

    /// Panic when delivering a record named `name`.
    pub fn panicking_on(name: &'static str) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), None, Some(name)))
    }

    fn build(fail_calls: Vec<usize>, fail_prefix: Option<&'static str>, panic_on: Option<&'static str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_calls,
            fail_prefix,
            panic_on,
            inner: RecordingSink::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSink for ScriptedSink {
    async fn log(&self, record: &Record) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on == Some(record.name.as_str()) {
            panic!("sink exploded on {}", record.name);
        }
        if self.fail_calls.contains(&call) {
            return Err(SinkError::Rejected(format!("scripted failure on call {call}")));
        }
        if self.fail_prefix.is_some_and(|p| record.name.starts_with(p)) {
            return Err(SinkError::Rejected(format!("refusing {}", record.name)));
        }
        self.inner.log(record).await
    }

    fn is_enabled_for(&self, severity: Severity) -> bool {
        self.inner.is_enabled_for(severity)
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush().await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

/// Holds every delivery until the test releases it.
pub struct GatedSink {
    permits: Semaphore,
    started: AtomicUsize,
    pub inner: RecordingSink,
}

#[allow(dead_code)]
impl GatedSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Semaphore::new(0),
            started: AtomicUsize::new(0),
            inner: RecordingSink::default(),
        })
    }

    /// Deliveries that have entered `log`, finished or not.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Let `n` more deliveries complete.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

#[async_trait]
impl EventSink for GatedSink {
    async fn log(&self, record: &Record) -> Result<(), SinkError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SinkError::Rejected("gate closed".into()))?;
        permit.forget();
        self.inner.log(record).await
    }

    fn is_enabled_for(&self, severity: Severity) -> bool {
        self.inner.is_enabled_for(severity)
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush().await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
