// src/monitor.rs

//! The public façade: a scoped monitoring session.
//!
//! A [`FileMonitor`] is configured once, registers any number of track/tail
//! requests and exclusion patterns, and is then started with [`run`]. `run`
//! spawns the supervisor and returns immediately; the session ends when a
//! termination cause fires (external trigger, timeout, abort-on-failure,
//! natural completion) or when [`terminate`]/[`close`] request it.
//!
//! [`run`]: FileMonitor::run
//! [`terminate`]: FileMonitor::terminate
//! [`close`]: FileMonitor::close

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::shared::SessionShared;
use crate::engine::supervisor::Supervisor;
use crate::errors::{MonitorError, Result, SessionFailure};
use crate::logging;
use crate::options::MonitorOptions;
use crate::request::{
    build_tail_spec, build_track_spec, check_exclusion, Discipline, ObservationSpec, TailRequest,
    TrackRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Configured,
    Running,
    Stopped,
}

/// A file monitoring session.
///
/// ```no_run
/// use parsewatch::{FileMonitor, MonitorOptions, TrackRequest};
///
/// # async fn dox() -> parsewatch::Result<()> {
/// let options = MonitorOptions::new()
///     .callback(|payload, meta| {
///         println!("{}: {payload:?}", meta.file_name.display());
///         Ok(())
///     });
///
/// let mut monitor = FileMonitor::new(options);
/// monitor.track(TrackRequest::new("out/*.json").tracked(["x"]))?;
/// monitor.run()?;
/// // ... produce data ...
/// monitor.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct FileMonitor {
    options: MonitorOptions,
    shared: Arc<SessionShared>,
    specs: Vec<Arc<ObservationSpec>>,
    registered: HashMap<String, Discipline>,
    supervisor: Option<JoinHandle<BTreeMap<String, String>>>,
    state: State,
}

impl FileMonitor {
    /// Create a session from its configuration. No workers exist until
    /// [`run`](Self::run) is called.
    pub fn new(options: MonitorOptions) -> Self {
        logging::init_logging(Some(options.log_level), options.plain_logging);
        let shared = SessionShared::new(&options);

        Self {
            options,
            shared,
            specs: Vec::new(),
            registered: HashMap::new(),
            supervisor: None,
            state: State::Configured,
        }
    }

    /// Register a snapshot observation request.
    ///
    /// Fails after [`run`](Self::run), on malformed globs or label
    /// constraints, and when a pattern is already registered for tailing.
    pub fn track(&mut self, request: TrackRequest) -> Result<()> {
        self.ensure_configured()?;
        self.check_conflicts(&request.globs, Discipline::Snapshot)?;
        let spec = build_track_spec(request)?;
        self.register(spec);
        Ok(())
    }

    /// Register an incremental observation request.
    ///
    /// Fails after [`run`](Self::run), on malformed globs or label
    /// constraints, and when a pattern is already registered for tracking.
    pub fn tail(&mut self, request: TailRequest) -> Result<()> {
        self.ensure_configured()?;
        self.check_conflicts(&request.globs, Discipline::Incremental)?;
        let spec = build_tail_spec(request)?;
        self.register(spec);
        Ok(())
    }

    /// Exclude files matching the pattern from observation.
    ///
    /// May be called before or during the session; it affects future
    /// discovery ticks only and never stops an already-running worker.
    pub fn exclude(&mut self, pattern: impl Into<String>) -> Result<()> {
        let pattern = pattern.into();
        check_exclusion(&pattern)?;
        self.shared.push_exclusion(pattern);
        Ok(())
    }

    /// Start the supervisor and all discovery workers. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(&mut self) -> Result<()> {
        self.ensure_configured()?;

        let supervisor = Supervisor {
            shared: Arc::clone(&self.shared),
            specs: self.specs.clone(),
            timeout: self.options.timeout,
            subprocess_triggers: self.options.subprocess_triggers.clone(),
            exception_callback: self.options.exception_callback.clone(),
        };
        self.supervisor = Some(tokio::spawn(supervisor.run()));
        self.state = State::Running;
        Ok(())
    }

    /// Request termination of the session. Cooperative: workers finish
    /// their current tick first.
    pub fn terminate(&self) {
        self.shared.cancel.cancel();
    }

    /// The session's termination trigger. Cancelling it from any thread or
    /// task requests shutdown, exactly like [`terminate`](Self::terminate).
    pub fn termination_trigger(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Wait until the session terminates on its own (external trigger,
    /// timeout, abort-on-failure or natural completion) and surface the
    /// aggregated failures, if any.
    pub async fn wait(&mut self) -> Result<()> {
        let handle = self.supervisor.take().ok_or(MonitorError::NotRunning)?;

        let failures = match handle.await {
            Ok(failures) => failures,
            Err(err) => BTreeMap::from([("supervisor".to_string(), err.to_string())]),
        };
        self.state = State::Stopped;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SessionFailure::new(failures).into())
        }
    }

    /// End the session: ensure termination has been requested, wait for the
    /// full shutdown and surface aggregated failures. The scope-exit
    /// equivalent; a session that never ran closes immediately.
    pub async fn close(mut self) -> Result<()> {
        if self.supervisor.is_none() {
            return Ok(());
        }
        self.terminate();
        self.wait().await
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.state == State::Configured {
            Ok(())
        } else {
            Err(MonitorError::AlreadyRunning)
        }
    }

    fn check_conflicts(&self, globs: &[String], discipline: Discipline) -> Result<()> {
        for glob in globs {
            if let Some(existing) = self.registered.get(glob) {
                if *existing != discipline {
                    return Err(MonitorError::DisciplineConflict {
                        pattern: glob.clone(),
                        existing: existing.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn register(&mut self, spec: ObservationSpec) {
        for glob in &spec.globs {
            self.registered.insert(glob.clone(), spec.discipline);
        }
        self.specs.push(Arc::new(spec));
    }
}
