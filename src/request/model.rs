// src/request/model.rs

//! Observation request model: what the user registers on a session.
//!
//! A request pairs one or more glob patterns with an observation discipline
//! and the extraction configuration. Requests are plain builders; they are
//! checked and compiled when registered, and immutable from then on.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::options::RecordCallback;
use crate::parse::{DeltaParser, ParserArgs, Payload, RecordMeta, SnapshotParser};

/// How a file is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Re-parse the whole file on every modification.
    Snapshot,
    /// Parse only the bytes appended since the previous read.
    Incremental,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Snapshot => write!(f, "snapshot"),
            Discipline::Incremental => write!(f, "incremental"),
        }
    }
}

/// A tracked-value entry: which parts of the parsed content to keep.
///
/// For snapshot requests these filter payload keys. For tail requests a
/// `Key` is a literal substring watched for in each line, and a `Pattern`
/// extracts values through its capture groups (see
/// [`TailRequest::tracked`]).
#[derive(Debug, Clone)]
pub enum TrackedValue {
    Key(String),
    Pattern(Regex),
}

impl From<&str> for TrackedValue {
    fn from(s: &str) -> Self {
        TrackedValue::Key(s.to_string())
    }
}

impl From<String> for TrackedValue {
    fn from(s: String) -> Self {
        TrackedValue::Key(s)
    }
}

impl From<Regex> for TrackedValue {
    fn from(r: Regex) -> Self {
        TrackedValue::Pattern(r)
    }
}

/// A pattern describing lines dropped before parsing (tail requests only).
///
/// `Line` compares for whole-line equality; `Pattern` drops any line the
/// regex matches.
#[derive(Debug, Clone)]
pub enum SkipPattern {
    Line(String),
    Pattern(Regex),
}

impl SkipPattern {
    pub(crate) fn matches(&self, line: &str) -> bool {
        match self {
            SkipPattern::Line(text) => text == line,
            SkipPattern::Pattern(regex) => regex.is_match(line),
        }
    }
}

impl From<&str> for SkipPattern {
    fn from(s: &str) -> Self {
        SkipPattern::Line(s.to_string())
    }
}

impl From<Regex> for SkipPattern {
    fn from(r: Regex) -> Self {
        SkipPattern::Pattern(r)
    }
}

/// Snapshot observation request: re-read and re-parse matching files in
/// full whenever they change.
pub struct TrackRequest {
    pub(crate) globs: Vec<String>,
    pub(crate) tracked: Vec<TrackedValue>,
    pub(crate) labels: Vec<Option<String>>,
    pub(crate) callback: Option<RecordCallback>,
    pub(crate) parser: Option<Arc<dyn SnapshotParser>>,
    pub(crate) parser_args: ParserArgs,
    pub(crate) static_read: bool,
    pub(crate) file_type: Option<String>,
}

impl TrackRequest {
    /// Request observing files matching a single glob pattern.
    pub fn new(glob: impl Into<String>) -> Self {
        Self::globs([glob.into()])
    }

    /// Request observing files matching any of the given glob patterns.
    pub fn globs<I, S>(globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globs: globs.into_iter().map(Into::into).collect(),
            tracked: Vec::new(),
            labels: Vec::new(),
            callback: None,
            parser: None,
            parser_args: ParserArgs::new(),
            static_read: false,
            file_type: None,
        }
    }

    /// Keep only payload items whose key equals a `Key` entry or matches a
    /// `Pattern` entry. Without tracked values the payload is delivered
    /// unchanged.
    pub fn tracked<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TrackedValue>,
    {
        self.tracked = values.into_iter().map(Into::into).collect();
        self
    }

    /// Positional labels renaming the keys emitted by the tracked values.
    /// When given, the list must be as long as `tracked`; `None` entries
    /// keep the matched key.
    pub fn labels<I>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Override the session record callback for this request.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(Payload, RecordMeta) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Use a custom snapshot parser instead of suffix dispatch.
    pub fn parser<P>(mut self, parser: P) -> Self
    where
        P: SnapshotParser + 'static,
    {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Static keyword arguments handed to the custom parser on every
    /// invocation.
    pub fn parser_args(mut self, args: ParserArgs) -> Self {
        self.parser_args = args;
        self
    }

    /// Terminate each file worker after one successful read. For files
    /// written once.
    pub fn static_read(mut self, static_read: bool) -> Self {
        self.static_read = static_read;
        self
    }

    /// Force a specific built-in parser (e.g. `"yaml"`), ignoring the file
    /// suffix.
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }
}

/// Incremental observation request: parse only content appended to matching
/// files since the previous read.
pub struct TailRequest {
    pub(crate) globs: Vec<String>,
    pub(crate) tracked: Vec<TrackedValue>,
    pub(crate) labels: Vec<Option<String>>,
    pub(crate) callback: Option<RecordCallback>,
    pub(crate) parser: Option<Arc<dyn DeltaParser>>,
    pub(crate) parser_args: ParserArgs,
    pub(crate) skip_lines: Vec<SkipPattern>,
}

impl TailRequest {
    /// Request tailing files matching a single glob pattern.
    pub fn new(glob: impl Into<String>) -> Self {
        Self::globs([glob.into()])
    }

    /// Request tailing files matching any of the given glob patterns.
    pub fn globs<I, S>(globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            globs: globs.into_iter().map(Into::into).collect(),
            tracked: Vec::new(),
            labels: Vec::new(),
            callback: None,
            parser: None,
            parser_args: ParserArgs::new(),
            skip_lines: Vec::new(),
        }
    }

    /// Values to extract from each appended line.
    ///
    /// - A `Key` entry watches for a literal substring; a matching line is
    ///   emitted in full under the entry's label.
    /// - A `Pattern` with no or one capture group emits the match (or the
    ///   capture) under the entry's label.
    /// - A `Pattern` with two capture groups emits (first capture, second
    ///   capture) as label and value; the positional label, when present,
    ///   overrides the captured one.
    pub fn tracked<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TrackedValue>,
    {
        self.tracked = values.into_iter().map(Into::into).collect();
        self
    }

    /// Positional labels for the tracked values. Required for entries that
    /// cannot derive a label from their own match.
    pub fn labels<I>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Override the session record callback for this request.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(Payload, RecordMeta) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Use a custom delta parser for the appended content. Mutually
    /// exclusive with tracked values and labels.
    pub fn parser<P>(mut self, parser: P) -> Self
    where
        P: DeltaParser + 'static,
    {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Static keyword arguments handed to the custom parser on every
    /// invocation.
    pub fn parser_args(mut self, args: ParserArgs) -> Self {
        self.parser_args = args;
        self
    }

    /// Drop lines matching any of these patterns before parsing.
    pub fn skip_lines<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<SkipPattern>,
    {
        self.skip_lines = patterns.into_iter().map(Into::into).collect();
        self
    }
}

/// A compiled, validated observation request as the workers consume it.
pub(crate) struct ObservationSpec {
    pub discipline: Discipline,
    pub globs: Vec<String>,
    pub matchers: Vec<crate::parse::Matcher>,
    pub callback: Option<RecordCallback>,
    pub snapshot_parser: Option<Arc<dyn SnapshotParser>>,
    pub delta_parser: Option<Arc<dyn DeltaParser>>,
    pub parser_args: ParserArgs,
    pub static_read: bool,
    pub file_type: Option<String>,
    pub skip_lines: Vec<SkipPattern>,
}

impl ObservationSpec {
    /// Worker-registry name for the discovery worker of this request.
    pub fn discovery_name(&self) -> String {
        format!("discovery[{}]", self.globs.join(", "))
    }
}
