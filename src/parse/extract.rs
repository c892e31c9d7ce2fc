// src/parse/extract.rs

//! The value extractor: turns parser payloads into the records that reach
//! the callback.
//!
//! Mapping payloads (snapshot discipline, custom delta parsers) are filtered
//! by key; raw lines (incremental discipline without a custom parser) have
//! their values pulled out by literal and regex matchers. Both paths share
//! the compiled [`Matcher`] form built at registration time.

use regex::Regex;
use serde_json::Value;

use crate::parse::contract::Payload;

/// A compiled tracked-value entry.
///
/// Label constraints (which shapes require an explicit label) are enforced
/// when the request is registered, so extraction never has to report them.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    /// Exact key match against mapping payloads; literal substring watch
    /// against raw lines.
    Literal { text: String, label: Option<String> },
    /// Regex key match against mapping payloads; capture-group extraction
    /// against raw lines.
    Pattern { regex: Regex, label: Option<String> },
}

/// Collapse a nested mapping into a single level, joining keys with `.`.
///
/// Sequence values are preserved as-is; an empty nested mapping collapses to
/// a `null` leaf so its key is not silently lost.
pub fn flatten_payload(payload: Payload) -> Payload {
    fn walk(prefix: Option<&str>, map: Payload, out: &mut Payload) {
        for (key, value) in map {
            let key = match prefix {
                Some(prefix) => format!("{prefix}.{key}"),
                None => key,
            };
            match value {
                Value::Object(inner) if inner.is_empty() => {
                    out.insert(key, Value::Null);
                }
                Value::Object(inner) => walk(Some(&key), inner, out),
                other => {
                    out.insert(key, other);
                }
            }
        }
    }

    let mut out = Payload::new();
    walk(None, payload, &mut out);
    out
}

/// Filter a mapping payload by the tracked values, optionally flattening it
/// first.
///
/// With no matchers the payload passes through unchanged. Otherwise an item
/// survives when its key equals a literal entry or matches a regex entry; a
/// non-null label at that position renames the emitted key. Matchers are
/// applied in registration order, so colliding labels resolve to the latest
/// entry. Returns `None` when nothing survives: the record is dropped.
pub(crate) fn extract_mapping(
    payload: Payload,
    matchers: &[Matcher],
    flatten: bool,
) -> Option<Payload> {
    let payload = if flatten {
        flatten_payload(payload)
    } else {
        payload
    };

    if matchers.is_empty() {
        return if payload.is_empty() { None } else { Some(payload) };
    }

    let mut out = Payload::new();
    for matcher in matchers {
        match matcher {
            Matcher::Literal { text, label } => {
                if let Some(value) = payload.get(text) {
                    let key = label.clone().unwrap_or_else(|| text.clone());
                    out.insert(key, value.clone());
                }
            }
            Matcher::Pattern { regex, label } => {
                for (key, value) in &payload {
                    if regex.is_match(key) {
                        let key = label.clone().unwrap_or_else(|| key.clone());
                        out.insert(key, value.clone());
                    }
                }
            }
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Extract tracked values from a single complete line.
///
/// - A literal entry that occurs in the line emits the whole line under its
///   label.
/// - A regex without capture groups, or with a single one, emits the match
///   (or the capture) under its label; several matches on one line get the
///   label suffixed `_0`, `_1`, … in match order.
/// - A regex with two capture groups emits (first capture, second capture)
///   pairs, the positional label overriding the captured one when present.
///
/// Returns `None` when no matcher produced a value: no record for this line.
pub(crate) fn extract_from_line(line: &str, matchers: &[Matcher]) -> Option<Payload> {
    let mut out = Payload::new();

    for matcher in matchers {
        match matcher {
            Matcher::Literal { text, label } => {
                let Some(label) = label else { continue };
                if line.contains(text.as_str()) {
                    out.insert(label.clone(), Value::String(line.to_string()));
                }
            }
            Matcher::Pattern { regex, label } => {
                let groups = regex.captures_len() - 1;
                if groups >= 2 {
                    for caps in regex.captures_iter(line) {
                        let captured = caps.get(1).map_or("", |m| m.as_str());
                        let value = caps.get(2).map_or("", |m| m.as_str());
                        let key = label.clone().unwrap_or_else(|| captured.to_string());
                        out.insert(key, Value::String(value.to_string()));
                    }
                } else {
                    let Some(label) = label else { continue };
                    let values: Vec<String> = regex
                        .captures_iter(line)
                        .map(|caps| {
                            let m = if groups == 1 { caps.get(1) } else { caps.get(0) };
                            m.map_or("", |m| m.as_str()).to_string()
                        })
                        .collect();

                    if values.len() > 1 {
                        for (i, value) in values.into_iter().enumerate() {
                            out.insert(format!("{label}_{i}"), Value::String(value));
                        }
                    } else if let Some(value) = values.into_iter().next() {
                        out.insert(label.clone(), Value::String(value));
                    }
                }
            }
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
