//! End-to-end: JSONL frames through the engine into a JSONL sink

use activity_monitor::domain::ActivityEvent;
use activity_monitor::infra::{Config, Metrics};
use activity_monitor::io::{read_observations, ClassMap, JsonlSink};
use activity_monitor::services::ActivityEngine;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// One frame per second with the cat at the food bowl for `secs` seconds
fn feeding_frames(secs: u64) -> String {
    let mut out = String::new();
    for s in 0..=secs {
        writeln!(
            out,
            r#"{{"ts": {}, "detections": [{{"class": "cat", "bbox": [480, 410, 540, 455], "confidence": 0.87}}]}}"#,
            s * 1000
        )
        .unwrap();
    }
    out
}

fn read_events(path: &std::path::Path) -> Vec<ActivityEvent> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

async fn run_pipeline(config: &Config, input: &str, sink: JsonlSink) -> (usize, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new());
    let (tx, rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let classes = ClassMap::from_config(config.classes());
    let reader = tokio::io::BufReader::new(std::io::Cursor::new(input.as_bytes().to_vec()));
    let source = tokio::spawn(read_observations(reader, classes, tx, shutdown_rx.clone(), metrics.clone()));

    let mut engine = ActivityEngine::new(config, sink, metrics.clone());
    engine.run(rx, shutdown_rx).await;

    let forwarded = source.await.unwrap().unwrap();
    (forwarded, metrics)
}

#[tokio::test]
async fn test_feeding_session_writes_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let events_path = dir.path().join("out/activity.jsonl");
    let sink = JsonlSink::new(&events_path, dir.path().join("out/system.jsonl"));

    let (forwarded, metrics) = run_pipeline(&Config::default(), &feeding_frames(20), sink).await;

    assert_eq!(forwarded, 21);
    assert_eq!(metrics.ticks_total(), 21);
    let events = read_events(&events_path);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].activity(), "Eating");
    assert_eq!(events[0].ts(), 5000);
    assert_eq!(events[0].zone(), Some("Food"));
    assert_eq!(events[0].confidence(), Some(0.87));
}

#[tokio::test]
async fn test_malformed_lines_do_not_reach_engine() {
    let dir = tempfile::tempdir().unwrap();
    let events_path = dir.path().join("activity.jsonl");
    let sink = JsonlSink::new(&events_path, dir.path().join("system.jsonl"));

    let mut input = feeding_frames(6);
    input.push_str("{\"ts\": \"not a time\"}\n");
    input.push_str("definitely not json\n");

    let (forwarded, metrics) = run_pipeline(&Config::default(), &input, sink).await;

    assert_eq!(forwarded, 7);
    assert_eq!(metrics.source_errors(), 2);
    assert_eq!(read_events(&events_path).len(), 1);
}

#[tokio::test]
async fn test_sleep_and_wake_across_gap() {
    let dir = tempfile::tempdir().unwrap();
    let events_path = dir.path().join("activity.jsonl");
    let sink = JsonlSink::new(&events_path, dir.path().join("system.jsonl"));

    let input = [
        r#"{"ts": 0, "subject": {"bbox": [300, 300, 340, 340], "confidence": 0.9}}"#,
        r#"{"ts": 300000}"#,
        r#"{"ts": 600000}"#,
        r#"{"ts": 650000, "subject": {"bbox": [260, 300, 300, 340], "confidence": 0.9}}"#,
    ]
    .join("\n");

    run_pipeline(&Config::default(), &input, sink).await;

    let events = read_events(&events_path);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].activity(), "Sleeping");
    assert_eq!(events[0].ts(), 600_000);
    assert_eq!(events[0].confidence(), None);
}
