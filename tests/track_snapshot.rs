// tests/track_snapshot.rs

mod common;
use crate::common::{init_tracing, write_file, RecordSink};

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

use parsewatch::{
    FileMonitor, MonitorOptions, ParsedOutput, ParserArgs, TrackRequest, TrackedValue,
};

type TestResult = Result<(), Box<dyn Error>>;

fn options(sink: &RecordSink) -> MonitorOptions {
    MonitorOptions::new()
        .callback(sink.callback())
        .interval(Duration::from_millis(25))
}

/// Overwrite a file atomically so a concurrent snapshot read never observes
/// a half-written document.
fn replace_file(path: &Path, content: &str) {
    let staged = path.with_extension("staged");
    std::fs::write(&staged, content).expect("writing staged file");
    std::fs::rename(&staged, path).expect("renaming staged file");
}

#[tokio::test]
async fn key_filter_reparses_on_change() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = dir.path().join("a.json");
    write_file(&file, r#"{"x": 1, "y": 2}"#);

    let sink = RecordSink::new();
    let mut monitor = FileMonitor::new(options(&sink));
    monitor.track(TrackRequest::new(file.to_string_lossy()).tracked(["x"]))?;
    monitor.run()?;

    sleep(Duration::from_millis(400)).await;
    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("x"), Some(&json!(1)));
    assert!(payloads[0].get("y").is_none());

    // The worker persists (static unset): a rewrite yields a second record.
    replace_file(&file, r#"{"x": 3, "y": 2}"#);
    sleep(Duration::from_millis(400)).await;

    timeout(Duration::from_secs(5), monitor.close()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1].get("x"), Some(&json!(3)));
    Ok(())
}

#[tokio::test]
async fn static_request_reads_once_and_completes() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = dir.path().join("b.toml");
    write_file(&file, "k = \"v\"\n");

    let sink = RecordSink::new();
    let mut monitor = FileMonitor::new(options(&sink));
    monitor.track(TrackRequest::new(file.to_string_lossy()).static_read(true))?;
    monitor.run()?;

    // The session completes naturally once every static read is done.
    timeout(Duration::from_secs(5), monitor.wait()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("k"), Some(&json!("v")));

    // Subsequent writes produce no records: the worker has terminated.
    replace_file(&file, "k = \"w\"\n");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.len(), 1);
    Ok(())
}

#[tokio::test]
async fn discovers_files_created_after_run() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let pattern = format!("{}/*.json", dir.path().display());

    let sink = RecordSink::new();
    let mut monitor = FileMonitor::new(options(&sink));
    monitor.track(TrackRequest::new(pattern))?;
    monitor.run()?;

    sleep(Duration::from_millis(100)).await;
    write_file(&dir.path().join("late.json"), r#"{"ready": true}"#);
    sleep(Duration::from_millis(400)).await;

    timeout(Duration::from_secs(5), monitor.close()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("ready"), Some(&json!(true)));
    Ok(())
}

#[tokio::test]
async fn file_type_override_forces_builtin_parser() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = dir.path().join("output.dat");
    write_file(&file, r#"{"value": 7}"#);

    let sink = RecordSink::new();
    let mut monitor = FileMonitor::new(options(&sink));
    monitor.track(TrackRequest::new(file.to_string_lossy()).file_type("json"))?;
    monitor.run()?;

    sleep(Duration::from_millis(400)).await;
    timeout(Duration::from_secs(5), monitor.close()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("value"), Some(&json!(7)));
    Ok(())
}

fn metrics_parser(path: &Path, args: &ParserArgs) -> anyhow::Result<ParsedOutput> {
    let raw = std::fs::read_to_string(path)?;
    let mut payload = parsewatch::Payload::new();
    payload.insert("elapsed".to_string(), json!(raw.trim().parse::<i64>()?));
    if let Some(units) = args.get("units") {
        payload.insert("units".to_string(), units.clone());
    }
    Ok(ParsedOutput::single(payload))
}

#[tokio::test]
async fn custom_parser_receives_static_args() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = dir.path().join("metrics.out");
    write_file(&file, "42");

    let mut args = ParserArgs::new();
    args.insert("units".to_string(), json!("seconds"));

    let sink = RecordSink::new();
    let mut monitor = FileMonitor::new(options(&sink));
    monitor.track(
        TrackRequest::new(file.to_string_lossy())
            .parser(metrics_parser)
            .parser_args(args)
            .static_read(true),
    )?;
    monitor.run()?;

    timeout(Duration::from_secs(5), monitor.wait()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("elapsed"), Some(&json!(42)));
    assert_eq!(payloads[0].get("units"), Some(&json!("seconds")));
    Ok(())
}

#[tokio::test]
async fn flatten_collapses_nested_payloads() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = dir.path().join("nested.json");
    write_file(&file, r#"{"outer": {"inner": 5}, "list": [1, 2]}"#);

    let sink = RecordSink::new();
    let options = MonitorOptions::new()
        .callback(sink.callback())
        .interval(Duration::from_millis(25))
        .flatten_data(true);

    let mut monitor = FileMonitor::new(options);
    monitor.track(TrackRequest::new(file.to_string_lossy()).static_read(true))?;
    monitor.run()?;

    timeout(Duration::from_secs(5), monitor.wait()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("outer.inner"), Some(&json!(5)));
    // Sequence values are preserved as-is.
    assert_eq!(payloads[0].get("list"), Some(&json!([1, 2])));
    Ok(())
}

#[tokio::test]
async fn labels_rename_filtered_keys() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let file = dir.path().join("run.json");
    write_file(&file, r#"{"x": 1, "step_a": 2, "step_b": 3}"#);

    let sink = RecordSink::new();
    let mut monitor = FileMonitor::new(options(&sink));
    monitor.track(
        TrackRequest::new(file.to_string_lossy())
            .tracked([
                TrackedValue::Key("x".to_string()),
                TrackedValue::Pattern(regex::Regex::new(r"^step_")?),
            ])
            .labels([Some("renamed".to_string()), None])
            .static_read(true),
    )?;
    monitor.run()?;

    timeout(Duration::from_secs(5), monitor.wait()).await??;

    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].get("renamed"), Some(&json!(1)));
    // Regex-matched keys keep their own names when the label slot is None.
    assert_eq!(payloads[0].get("step_a"), Some(&json!(2)));
    assert_eq!(payloads[0].get("step_b"), Some(&json!(3)));
    assert!(payloads[0].get("x").is_none());
    Ok(())
}
