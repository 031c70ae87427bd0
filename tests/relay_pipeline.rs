//! Configuration through tracker, engine and file sink.

use std::sync::Arc;
use std::time::Duration;

use event_relay::config::loader::parse_config;
use event_relay::delivery::DeliveryEngine;
use event_relay::gate::{DeliveryGate, FileTokenRepository};
use event_relay::record::Severity;
use event_relay::sink::build_sink;
use event_relay::time::{PrecisionTimestamp, Zone};
use event_relay::Tracker;
use serde_json::Value;

mod common;

#[tokio::test]
async fn test_configured_pipeline_writes_gated_records() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("out").join("events.jsonl");
    let token_path = dir.path().join("tokens.toml");
    std::fs::write(&token_path, "[tokens]\ncheckout = \"WARNING\"\n").unwrap();

    let config = parse_config(&format!(
        r#"
        [engine]
        pool_size = 1
        queue_capacity = 32

        [gate]
        default_threshold = "INFO"
        token_file = {token:?}

        [sink]
        kind = "file"
        path = {log:?}
        format = "json"

        [timestamp]
        pattern = "yyyy-MM-dd HH:mm:ss.SSSSSS"
        timezone = "UTC"
        "#,
        token = token_path.display().to_string(),
        log = log_path.display().to_string(),
    ))
    .unwrap();

    let repo = Arc::new(FileTokenRepository::open(config.gate.token_file.as_deref().unwrap()).unwrap());
    let gate = DeliveryGate::new(repo, config.gate.default_threshold);
    let sink = build_sink(&config.sink, &config.timestamp).await.unwrap();
    let engine = Arc::new(DeliveryEngine::new(config.engine.clone(), sink));
    engine.start().unwrap();

    let checkout = Tracker::new("checkout", gate.clone(), engine.clone());
    let search = Tracker::new("search", gate, engine.clone());

    assert!(!checkout.track(Severity::Info, "view", "cart opened").await.unwrap());
    assert!(checkout.track(Severity::Error, "pay", "card declined").await.unwrap());
    assert!(search.track(Severity::Info, "query", "shoes").await.unwrap());
    assert!(!search.track(Severity::Debug, "query", "internal").await.unwrap());

    let report = common::bounded(engine.shutdown(Duration::from_secs(2))).await;
    assert_eq!(report.stats.delivered, 2);

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["source"], "checkout");
    assert_eq!(lines[0]["message"], "card declined");
    assert_eq!(lines[1]["source"], "search");

    // The rendered time parses back to the same instant.
    let rendered = lines[0]["time"].as_str().unwrap();
    let parsed = PrecisionTimestamp::parse(rendered, Some("yyyy-MM-dd HH:mm:ss.SSSSSS"), Some(Zone::utc())).unwrap();
    assert_eq!(parsed.total_micros(), lines[0]["time_usec"].as_i64().unwrap());
}

#[test]
fn test_microsecond_text_round_trip() {
    let pattern = "yyyy-MM-dd HH:mm:ss.SSSSSS";
    let ts = PrecisionTimestamp::parse("2024-01-01 00:00:00.123456", Some(pattern), Some(Zone::utc())).unwrap();
    assert_eq!(ts.total_micros(), 1_704_067_200_123_456);
    assert_eq!(ts.format(Some(pattern), Some(Zone::utc())).unwrap(), "2024-01-01 00:00:00.123456");
}

#[test]
fn test_carry_example() {
    let mut ts = PrecisionTimestamp::from_parts(1000, 500).unwrap();
    ts.add_parts(0, 600).unwrap();
    assert_eq!((ts.millis(), ts.micros()), (1001, 100));
}
