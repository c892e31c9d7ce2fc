// tests/extraction.rs

mod common;
use crate::common::init_tracing;

use serde_json::json;

use parsewatch::{flatten_payload, LineAccumulator, Payload};

fn payload_from(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn flatten_is_a_noop_on_flat_payloads() {
    init_tracing();
    let payload = payload_from(json!({"a": 1, "b": "two"}));
    assert_eq!(flatten_payload(payload.clone()), payload);
}

#[test]
fn flatten_joins_nested_keys_with_dots() {
    init_tracing();
    let payload = payload_from(json!({
        "outer": {"inner": {"leaf": 3}},
        "top": true,
    }));

    let flat = flatten_payload(payload);
    assert_eq!(flat.get("outer.inner.leaf"), Some(&json!(3)));
    assert_eq!(flat.get("top"), Some(&json!(true)));
    assert!(flat.get("outer").is_none());
}

#[test]
fn flatten_preserves_sequences_and_keeps_empty_mappings() {
    init_tracing();
    let payload = payload_from(json!({
        "seq": [{"k": 1}, 2],
        "empty": {},
    }));

    let flat = flatten_payload(payload);
    assert_eq!(flat.get("seq"), Some(&json!([{"k": 1}, 2])));
    // An empty nested mapping collapses to a null leaf rather than
    // disappearing.
    assert_eq!(flat.get("empty"), Some(&json!(null)));
}

#[test]
fn line_accumulator_buffers_unterminated_fragments() {
    init_tracing();
    let mut accumulator = LineAccumulator::new();

    assert_eq!(accumulator.push(b"ab"), Vec::<String>::new());
    assert_eq!(accumulator.pending_len(), 2);

    assert_eq!(accumulator.push(b"c\nd"), vec!["abc".to_string()]);
    assert_eq!(accumulator.pending_len(), 1);

    assert_eq!(accumulator.push(b"\n"), vec!["d".to_string()]);
    assert_eq!(accumulator.pending_len(), 0);
}

#[test]
fn line_accumulator_strips_carriage_returns() {
    init_tracing();
    let mut accumulator = LineAccumulator::new();
    assert_eq!(
        accumulator.push(b"one\r\ntwo\n"),
        vec!["one".to_string(), "two".to_string()]
    );
}

#[test]
fn line_accumulator_discard_drops_the_fragment() {
    init_tracing();
    let mut accumulator = LineAccumulator::new();
    accumulator.push(b"partial");
    assert_eq!(accumulator.pending_len(), 7);

    accumulator.discard();
    assert_eq!(accumulator.pending_len(), 0);
    assert_eq!(accumulator.push(b"fresh\n"), vec!["fresh".to_string()]);
}
