// src/options.rs

//! Session configuration.
//!
//! A [`MonitorOptions`] value is built once, handed to
//! [`FileMonitor::new`](crate::FileMonitor::new) and immutable afterwards.
//! All options have defaults; the builder-style methods exist so a session
//! can be configured in one expression.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::parse::{Payload, RecordMeta};

/// Record sink: called with the extracted payload and the record envelope.
///
/// Returning an error marks the invoking worker as failed, exactly as a
/// parser failure would.
pub type RecordCallback = Arc<dyn Fn(Payload, RecordMeta) -> anyhow::Result<()> + Send + Sync>;

/// Receives the aggregated failure message at termination.
pub type MessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives each observed path on first sighting.
pub type PathCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Configuration for a monitoring session.
#[derive(Clone)]
pub struct MonitorOptions {
    pub(crate) callback: Option<RecordCallback>,
    pub(crate) exception_callback: Option<MessageCallback>,
    pub(crate) notification_callback: Option<PathCallback>,
    pub(crate) termination_trigger: Option<CancellationToken>,
    pub(crate) subprocess_triggers: Vec<CancellationToken>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) lock_callbacks: bool,
    pub(crate) interval: Duration,
    pub(crate) flatten_data: bool,
    pub(crate) plain_logging: bool,
    pub(crate) terminate_all_on_fail: bool,
    pub(crate) file_limit: Option<usize>,
    pub(crate) log_level: tracing::Level,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            callback: None,
            exception_callback: None,
            notification_callback: None,
            termination_trigger: None,
            subprocess_triggers: Vec::new(),
            timeout: None,
            lock_callbacks: false,
            interval: Duration::from_millis(100),
            flatten_data: false,
            plain_logging: false,
            terminate_all_on_fail: false,
            file_limit: Some(50),
            log_level: tracing::Level::INFO,
        }
    }
}

impl MonitorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default record sink for every request that does not override it.
    ///
    /// Without one, records from requests lacking their own callback are
    /// dropped with a warning.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(Payload, RecordMeta) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Called once, at termination, with the aggregated failure message when
    /// at least one worker failed.
    pub fn exception_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.exception_callback = Some(Arc::new(f));
        self
    }

    /// Called with each observed path on first sighting, strictly before any
    /// record callback for that path. Defaults to an `info`-level log line.
    pub fn notification_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        self.notification_callback = Some(Arc::new(f));
        self
    }

    /// External termination trigger. Cancelling the token from anywhere
    /// requests session shutdown; the token is set once and never cleared.
    pub fn termination_trigger(mut self, trigger: CancellationToken) -> Self {
        self.termination_trigger = Some(trigger);
        self
    }

    /// Add a downstream trigger cancelled by the supervisor on termination,
    /// strictly after all workers have been joined.
    pub fn subprocess_trigger(mut self, trigger: CancellationToken) -> Self {
        self.subprocess_triggers.push(trigger);
        self
    }

    /// Terminate the session once this much time has elapsed after `run`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Serialise every callback invocation across the session through one
    /// mutex. Default `false`: callbacks may run concurrently.
    pub fn lock_callbacks(mut self, lock: bool) -> Self {
        self.lock_callbacks = lock;
        self
    }

    /// Poll period for discovery and file workers. Default 100 ms.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Collapse nested payload mappings into a single level using `.` as the
    /// key delimiter before filtering and delivery.
    pub fn flatten_data(mut self, flatten: bool) -> Self {
        self.flatten_data = flatten;
        self
    }

    /// Disable ANSI colouring in log output.
    pub fn plain_logging(mut self, plain: bool) -> Self {
        self.plain_logging = plain;
        self
    }

    /// Request global termination as soon as any worker fails. Default
    /// `false`: failures are collected and surfaced at termination.
    pub fn terminate_all_on_fail(mut self, terminate: bool) -> Self {
        self.terminate_all_on_fail = terminate;
        self
    }

    /// Cap on concurrently live file workers per discipline; `None` removes
    /// the limit. Default 50. Excess candidates are deferred to a later
    /// discovery tick.
    pub fn file_limit(mut self, limit: Option<usize>) -> Self {
        self.file_limit = limit;
        self
    }

    /// Log level for the session's subscriber (if this process installs it).
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }
}
