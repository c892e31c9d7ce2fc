// src/parse/contract.rs

//! The parser contract consumed by file workers.
//!
//! Two parser shapes exist:
//!
//! - [`SnapshotParser`]: reads a whole file from a path and returns its
//!   content as one or more key-value mappings. Used by the snapshot
//!   discipline, where the file is re-read on every modification.
//! - [`DeltaParser`]: consumes a string holding the content appended since
//!   the previous read. Used by the incremental discipline for append-only
//!   files.
//!
//! Both shapes are object-safe traits with blanket implementations for plain
//! functions, so a closure can be handed to a request directly. Parsers
//! report failure through `anyhow::Error`; the core classifies any returned
//! error as a worker failure.

use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::Serialize;
use serde_json::Value;

/// A single-level (or nested, prior to flattening) key-value mapping
/// produced by a parser.
pub type Payload = serde_json::Map<String, Value>;

/// Parser-supplied metadata merged into the record envelope.
pub type Extras = serde_json::Map<String, Value>;

/// Static keyword arguments configured on a request and handed, immutably,
/// to every invocation of a custom parser.
pub type ParserArgs = serde_json::Map<String, Value>;

/// Metadata accompanying every record delivered to a callback.
#[derive(Debug, Clone, Serialize)]
pub struct RecordMeta {
    /// Absolute path of the observed file.
    pub file_name: PathBuf,
    /// Wall-clock time of record emission, seconds since the Unix epoch.
    pub timestamp: f64,
    /// Parser-supplied extras, e.g. `read_bytes` for incremental records.
    pub extras: Extras,
}

/// Normalised parser output: optional extras plus one or more payload
/// mappings.
///
/// Parsers covering several independent records in one invocation (a delta
/// spanning multiple entries, a file holding an array of documents) return
/// multiple payloads; each is filtered and delivered to the callback
/// separately, in order.
#[derive(Debug, Clone, Default)]
pub struct ParsedOutput {
    pub extras: Extras,
    payloads: Vec<Payload>,
}

impl ParsedOutput {
    /// Output covering a single record.
    pub fn single(payload: Payload) -> Self {
        Self {
            extras: Extras::new(),
            payloads: vec![payload],
        }
    }

    /// Output covering several independent records, in order.
    pub fn many(payloads: Vec<Payload>) -> Self {
        Self {
            extras: Extras::new(),
            payloads,
        }
    }

    /// Attach parser metadata to the output.
    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }

    /// Normalise an arbitrary deserialised value.
    ///
    /// A top-level object becomes a single payload; a top-level array of
    /// objects becomes one payload per element. Anything else is rejected:
    /// the record contract is a mapping from string labels to values.
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::single(map)),
            Value::Array(items) => {
                let mut payloads = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => payloads.push(map),
                        other => bail!(
                            "expected an array of mappings, found element {other}"
                        ),
                    }
                }
                Ok(Self::many(payloads))
            }
            other => bail!("expected a mapping or array of mappings, found {other}"),
        }
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn into_payloads(self) -> Vec<Payload> {
        self.payloads
    }
}

/// A parser that reads a file in full.
pub trait SnapshotParser: Send + Sync {
    fn parse_file(&self, path: &Path, args: &ParserArgs) -> anyhow::Result<ParsedOutput>;
}

impl<F> SnapshotParser for F
where
    F: Fn(&Path, &ParserArgs) -> anyhow::Result<ParsedOutput> + Send + Sync,
{
    fn parse_file(&self, path: &Path, args: &ParserArgs) -> anyhow::Result<ParsedOutput> {
        self(path, args)
    }
}

/// A parser that consumes the content appended since the previous read.
pub trait DeltaParser: Send + Sync {
    fn parse_delta(&self, content: &str, args: &ParserArgs) -> anyhow::Result<ParsedOutput>;
}

impl<F> DeltaParser for F
where
    F: Fn(&str, &ParserArgs) -> anyhow::Result<ParsedOutput> + Send + Sync,
{
    fn parse_delta(&self, content: &str, args: &ParserArgs) -> anyhow::Result<ParsedOutput> {
        self(content, args)
    }
}
