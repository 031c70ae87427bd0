//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define delivery metrics (throughput, drops, failures, queue depth)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_records_submitted_total` (counter): records accepted by the queue
//! - `relay_records_delivered_total` (counter): records the sink accepted
//! - `relay_records_dropped_total` (counter): refused at submit, by `reason`
//! - `relay_records_skipped_total` (counter): sink not enabled for the severity
//! - `relay_delivery_failures_total` (counter): sink errors after retries
//! - `relay_records_discarded_total` (counter): still queued at forced shutdown
//! - `relay_workers_recycled_total` (counter): workers replaced, by `cause`
//! - `relay_queue_depth` (gauge): records waiting in the queue
//! - `relay_delivery_duration_seconds` (histogram): sink call latency
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Without `init_metrics` every call is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_submitted() {
    counter!("relay_records_submitted_total").increment(1);
}

/// Record a successful delivery that started at `start`.
pub fn record_delivered(start: Instant) {
    counter!("relay_records_delivered_total").increment(1);
    histogram!("relay_delivery_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// `reason` is `queue_full` or `timeout`.
pub fn record_dropped(reason: &'static str) {
    counter!("relay_records_dropped_total", "reason" => reason).increment(1);
}

pub fn record_skipped() {
    counter!("relay_records_skipped_total").increment(1);
}

pub fn record_failure(start: Instant) {
    counter!("relay_delivery_failures_total").increment(1);
    histogram!("relay_delivery_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_discarded(count: usize) {
    counter!("relay_records_discarded_total").increment(count as u64);
}

/// `cause` is `failures` or `panic`.
pub fn record_recycled(cause: &'static str) {
    counter!("relay_workers_recycled_total", "cause" => cause).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("relay_queue_depth").set(depth as f64);
}
