//! End-to-end behaviour of the pooled delivery engine.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use event_relay::config::OverflowPolicy;
use event_relay::delivery::{DeliveryEngine, DeliveryError, EngineState};
use event_relay::record::{Record, Severity};
use tokio::time::Instant;

mod common;

use common::{bounded, engine_config, record, wait_until, GatedSink, RecordingSink, ScriptedSink};

#[tokio::test]
async fn test_single_worker_preserves_submission_order() {
    let sink = RecordingSink::new();
    let engine = DeliveryEngine::new(engine_config(1, 16, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    let expected: Vec<String> = (0..200).map(|i| format!("r{i}")).collect();
    for name in &expected {
        engine.submit(record(name)).await.unwrap();
    }

    let report = bounded(engine.shutdown(Duration::from_secs(5))).await;
    assert!(report.drained);
    assert_eq!(report.discarded, 0);
    assert_eq!(report.stats.submitted, 200);
    assert_eq!(report.stats.delivered, 200);
    assert_eq!(sink.names(), expected);
    assert!(sink.flushed.load(Ordering::SeqCst));
    assert!(sink.closed.load(Ordering::SeqCst));
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_delivers_every_record_once() {
    let sink = RecordingSink::new();
    let engine = Arc::new(DeliveryEngine::new(engine_config(4, 64, OverflowPolicy::Block), sink.clone()));
    engine.start().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let engine = engine.clone();
            tokio::spawn(async move {
                for i in 0..250 {
                    engine.submit(record(&format!("p{p}-{i}"))).await.unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    let report = bounded(engine.shutdown(Duration::from_secs(5))).await;
    assert_eq!(report.stats.delivered, 1000);
    assert_eq!(sink.names().len(), 1000);
    assert_eq!(sink.unique().len(), 1000);
}

#[tokio::test]
async fn test_reject_policy_fails_fast_when_full() {
    let sink = GatedSink::new();
    let engine = DeliveryEngine::new(engine_config(1, 1, OverflowPolicy::Reject), sink.clone());
    engine.start().unwrap();

    // r1 in flight, r2 waiting in the queue.
    engine.submit(record("r1")).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.started() == 1).await);
    engine.submit(record("r2")).await.unwrap();

    let started = Instant::now();
    assert_eq!(engine.submit(record("r3")).await, Err(DeliveryError::QueueFull));
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(engine.stats().dropped, 1);
    assert_eq!(engine.queue_len(), 1);

    sink.release(10);
    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.inner.names(), vec!["r1", "r2"]);
    assert_eq!(report.stats.submitted, 2);
    assert_eq!(report.stats.dropped, 1);
}

#[tokio::test]
async fn test_block_policy_times_out() {
    let sink = GatedSink::new();
    let engine = DeliveryEngine::new(engine_config(1, 1, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    engine.submit(record("r1")).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.started() == 1).await);
    engine.submit(record("r2")).await.unwrap();

    let started = Instant::now();
    assert_eq!(engine.submit(record("r3")).await, Err(DeliveryError::EnqueueTimeout));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(engine.stats().dropped, 1);

    sink.release(10);
    bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.inner.names(), vec!["r1", "r2"]);
}

#[tokio::test]
async fn test_block_policy_waits_for_space() {
    let sink = GatedSink::new();
    let engine = Arc::new(DeliveryEngine::new(engine_config(1, 1, OverflowPolicy::Block), sink.clone()));
    engine.start().unwrap();

    engine.submit(record("r1")).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.started() == 1).await);
    engine.submit(record("r2")).await.unwrap();

    let blocked = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.submit(record("r3")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!blocked.is_finished());

    sink.release(1);
    assert_eq!(blocked.await.unwrap(), Ok(()));

    sink.release(10);
    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.inner.names(), vec!["r1", "r2", "r3"]);
    assert_eq!(report.stats.dropped, 0);
}

#[tokio::test]
async fn test_try_submit_never_waits() {
    let sink = GatedSink::new();
    let engine = DeliveryEngine::new(engine_config(1, 1, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    engine.try_submit(record("r1")).unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.started() == 1).await);
    engine.try_submit(record("r2")).unwrap();
    assert_eq!(engine.try_submit(record("r3")), Err(DeliveryError::QueueFull));
    assert_eq!(engine.stats().dropped, 1);

    sink.release(10);
    bounded(engine.shutdown(Duration::from_secs(2))).await;
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_worker() {
    let sink = ScriptedSink::failing_calls(&[2]);
    let engine = DeliveryEngine::new(engine_config(1, 8, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    for name in ["r1", "r2", "r3"] {
        engine.submit(record(name)).await.unwrap();
    }
    assert!(wait_until(Duration::from_secs(2), || engine.stats().settled() == 3).await);
    assert_eq!(engine.active_workers(), 1);

    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.inner.names(), vec!["r1", "r3"]);
    assert_eq!(report.stats.delivered, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.recycled, 0);
}

#[tokio::test]
async fn test_retries_recover_transient_failure() {
    let sink = ScriptedSink::failing_calls(&[1, 2]);
    let mut config = engine_config(1, 8, OverflowPolicy::Block);
    config.delivery_retries = 2;
    let engine = DeliveryEngine::new(config, sink.clone());
    engine.start().unwrap();

    engine.submit(record("r1")).await.unwrap();
    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;

    assert_eq!(sink.calls(), 3);
    assert_eq!(report.stats.delivered, 1);
    assert_eq!(report.stats.failed, 0);
}

#[tokio::test]
async fn test_degraded_worker_is_recycled() {
    let sink = ScriptedSink::failing_prefix("bad");
    let mut config = engine_config(1, 16, OverflowPolicy::Block);
    config.failure_threshold = 2;
    let engine = DeliveryEngine::new(config, sink.clone());
    engine.start().unwrap();

    for name in ["bad-1", "bad-2", "ok-1", "ok-2"] {
        engine.submit(record(name)).await.unwrap();
    }
    assert!(wait_until(Duration::from_secs(2), || engine.stats().delivered == 2).await);

    let stats = engine.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.recycled, 1);
    assert!(wait_until(Duration::from_secs(2), || engine.active_workers() == 1).await);

    bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.inner.names(), vec!["ok-1", "ok-2"]);
}

#[tokio::test]
async fn test_zero_threshold_never_recycles() {
    let sink = ScriptedSink::failing_prefix("bad");
    let mut config = engine_config(1, 64, OverflowPolicy::Block);
    config.failure_threshold = 0;
    let engine = DeliveryEngine::new(config, sink.clone());
    engine.start().unwrap();

    for i in 0..30 {
        engine.submit(record(&format!("bad-{i}"))).await.unwrap();
    }
    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(report.stats.failed, 30);
    assert_eq!(report.stats.recycled, 0);
}

#[tokio::test]
async fn test_panicking_worker_is_replaced() {
    let sink = ScriptedSink::panicking_on("boom");
    let engine = DeliveryEngine::new(engine_config(1, 8, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    for name in ["r1", "boom", "r2"] {
        engine.submit(record(name)).await.unwrap();
    }
    assert!(wait_until(Duration::from_secs(2), || engine.stats().delivered == 2).await);

    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.inner.names(), vec!["r1", "r2"]);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.recycled, 1);
}

#[tokio::test]
async fn test_disabled_severity_is_skipped() {
    let sink = RecordingSink::with_threshold(Severity::Warning);
    let engine = DeliveryEngine::new(engine_config(2, 8, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    engine.submit(Record::event("test", Severity::Debug, "chatter")).await.unwrap();
    engine.submit(Record::event("test", Severity::Error, "outage")).await.unwrap();

    let report = bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(sink.names(), vec!["outage"]);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.delivered, 1);
}

#[tokio::test]
async fn test_drain_deadline_discards_backlog() {
    let sink = GatedSink::new();
    let engine = DeliveryEngine::new(engine_config(1, 16, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    for i in 1..=5 {
        engine.submit(record(&format!("r{i}"))).await.unwrap();
    }
    assert!(wait_until(Duration::from_secs(2), || sink.started() == 1).await);

    // The in-flight delivery finishes only after the deadline has passed.
    let releaser = {
        let sink = sink.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            sink.release(100);
        })
    };

    let report = bounded(engine.shutdown(Duration::from_millis(50))).await;
    releaser.await.unwrap();

    assert!(!report.drained);
    assert_eq!(report.discarded, 4);
    assert_eq!(report.stats.discarded, 4);
    assert_eq!(report.stats.delivered, 1);
    assert_eq!(sink.inner.names(), vec!["r1"]);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_immediate_shutdown_closes_engine() {
    let sink = RecordingSink::slow(Duration::from_millis(2));
    let engine = DeliveryEngine::new(engine_config(2, 64, OverflowPolicy::Block), sink.clone());
    engine.start().unwrap();

    for i in 0..40 {
        engine.submit(record(&format!("r{i}"))).await.unwrap();
    }
    let report = bounded(engine.shutdown(Duration::ZERO)).await;

    assert_eq!(engine.submit(record("late")).await, Err(DeliveryError::EngineClosed));
    assert_eq!(engine.try_submit(record("late")), Err(DeliveryError::EngineClosed));
    assert_eq!(report.stats.delivered + report.stats.discarded, 40);

    let delivered = engine.stats().delivered;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.stats().delivered, delivered);
    assert_eq!(sink.names().len() as u64, delivered);
    assert_eq!(engine.active_workers(), 0);
}

#[tokio::test]
async fn test_shutdown_is_idempotent_under_concurrency() {
    let sink = RecordingSink::new();
    let engine = Arc::new(DeliveryEngine::new(engine_config(2, 16, OverflowPolicy::Block), sink));
    engine.start().unwrap();
    engine.submit(record("r1")).await.unwrap();

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.shutdown(Duration::from_secs(1)).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.shutdown(Duration::from_secs(1)).await })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_eq!(a.discarded + b.discarded, 0);
    assert!(wait_until(Duration::from_secs(2), || engine.state() == EngineState::Stopped).await);
    assert_eq!(engine.stats().delivered, 1);
}
