// src/lib.rs

//! `parsewatch`: parallel, polling-based observation of files matching glob
//! patterns.
//!
//! A session registers any number of observation requests, each pairing
//! glob patterns with an observation discipline:
//!
//! - **track** (snapshot): the file is re-read and re-parsed in full on
//!   every modification — for structured documents that are rewritten.
//! - **tail** (incremental): only bytes appended since the previous read
//!   are parsed — for append-only logs.
//!
//! Discovery workers expand the globs every poll interval and spawn one
//! file worker per newly sighted path. File workers detect changes against
//! the last-modified timestamp, run the configured parser, filter the
//! result by the request's tracked values and hand each surviving record to
//! a callback. A supervisor enforces termination (external trigger,
//! timeout, abort-on-failure or natural completion), joins the worker tree
//! and surfaces per-worker failures as one aggregated error.
//!
//! ```no_run
//! use parsewatch::{FileMonitor, MonitorOptions, TailRequest, TrackedValue};
//! use regex::Regex;
//!
//! # async fn dox() -> parsewatch::Result<()> {
//! let options = MonitorOptions::new()
//!     .callback(|payload, meta| {
//!         println!("{}: {payload:?}", meta.file_name.display());
//!         Ok(())
//!     });
//!
//! let mut monitor = FileMonitor::new(options);
//! let pattern = Regex::new(r"(\w+)=(\d+)").unwrap();
//! monitor.tail(TailRequest::new("run/*.log").tracked([TrackedValue::Pattern(pattern)]))?;
//! monitor.run()?;
//! // ... the watched process writes its logs ...
//! monitor.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod logging;
pub mod options;
pub mod parse;
pub mod request;
pub mod watch;

mod engine;
mod monitor;

pub use errors::{MonitorError, Result, SessionFailure};
pub use monitor::FileMonitor;
pub use options::{MessageCallback, MonitorOptions, PathCallback, RecordCallback};
pub use parse::{
    flatten_payload, DeltaParser, Extras, ParsedOutput, ParserArgs, ParserRegistry, Payload,
    RecordMeta, SnapshotParser,
};
pub use request::{Discipline, SkipPattern, TailRequest, TrackRequest, TrackedValue};
pub use watch::LineAccumulator;
