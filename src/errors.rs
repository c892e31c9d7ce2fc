// src/errors.rs

//! Error types for registration, session control and failure aggregation.
//!
//! Registration problems are reported synchronously as [`MonitorError`]
//! variants. Failures inside workers are collected per-worker while the
//! session runs and surfaced once, at termination, as a [`SessionFailure`].

use std::collections::BTreeMap;

/// Errors surfaced synchronously by request registration and session control.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// A glob pattern handed to `track`, `tail` or `exclude` did not compile.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The same glob pattern was registered under both disciplines.
    ///
    /// A path may be owned by at most one file worker per discipline, and
    /// the ownership of a pattern shared between snapshot and incremental
    /// observation would be ambiguous.
    #[error("pattern '{pattern}' is already registered for {existing} observation")]
    DisciplineConflict { pattern: String, existing: String },

    /// `labels` was given but its length differs from `tracked_values`.
    #[error("number of labels ({labels}) must match number of tracked values ({tracked})")]
    LabelCountMismatch { labels: usize, tracked: usize },

    /// A tracked value that cannot derive a label from its own match needs
    /// an explicit one.
    #[error("tracked value '{pattern}' requires an explicit label")]
    LabelRequired { pattern: String },

    /// A tracked regex captured more than a label and a value.
    #[error("tracked value '{pattern}' must capture at most a label and a value")]
    TooManyCaptures { pattern: String },

    /// Tail requests delegate extraction to a custom parser entirely; mixing
    /// one with tracked values or labels is rejected.
    #[error("tail requests cannot combine a custom parser with tracked values or labels")]
    ParserFilterConflict,

    /// `track`/`tail`/`run` called while the monitor is already running.
    #[error("requests cannot be registered after the monitor has started")]
    AlreadyRunning,

    /// `wait` called before `run`.
    #[error("the monitor has not been started")]
    NotRunning,

    /// No built-in parser is registered for the given file type.
    #[error("no parser available for file type '{file_type}'")]
    ParserUnavailable { file_type: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more workers failed during the session.
    #[error(transparent)]
    Session(#[from] SessionFailure),
}

/// Aggregate of every worker failure collected during a session.
///
/// Built by the supervisor at termination; the rendered message carries one
/// fragment per failed worker. The same message is handed to the exception
/// callback, if one is configured.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SessionFailure {
    message: String,
    failures: BTreeMap<String, String>,
}

impl SessionFailure {
    pub(crate) fn new(failures: BTreeMap<String, String>) -> Self {
        let mut message = format!(
            "file monitoring session encountered {} failure(s):",
            failures.len()
        );
        for (worker, error) in &failures {
            message.push_str(&format!("\n  {worker}: {error}"));
        }
        Self { message, failures }
    }

    /// Per-worker failure messages, keyed by the worker's name (the observed
    /// file path for file workers, the pattern list for discovery workers).
    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
