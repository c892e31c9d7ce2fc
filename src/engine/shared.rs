// src/engine/shared.rs

//! State shared by the supervisor and every worker of a session.
//!
//! Everything here is owned by the session: the root cancellation token,
//! the per-discipline ownership sets and live-worker counts, the one-shot
//! failure registry, the optional callback mutex and the exclusion-pattern
//! list (which may grow while the session runs).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::options::{MonitorOptions, PathCallback, RecordCallback};
use crate::parse::{Extras, Payload, RecordMeta};
use crate::request::{Discipline, ObservationSpec};

/// Lock a mutex, recovering the data from a poisoned lock instead of
/// panicking: a worker that panicked mid-callback must not take the rest of
/// the session down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-discipline ownership bookkeeping.
///
/// `owned` grows monotonically: a path stays owned after its worker
/// terminates, so a finished static read is never re-spawned. `live` counts
/// only running workers and enforces the concurrency cap.
struct DisciplineState {
    owned: Mutex<BTreeSet<PathBuf>>,
    live: AtomicUsize,
}

impl DisciplineState {
    fn new() -> Self {
        Self {
            owned: Mutex::new(BTreeSet::new()),
            live: AtomicUsize::new(0),
        }
    }
}

/// Outcome of a discovery worker's attempt to claim a path.
pub(crate) enum Claim {
    /// The path is now owned; the guard releases the live-worker slot when
    /// the worker finishes.
    Claimed(LiveGuard),
    /// Another worker (live or terminated) already owns this path.
    AlreadyOwned,
    /// The concurrency cap is reached; retry on a later tick.
    Deferred,
}

/// Decrements the discipline's live-worker count when the worker task ends.
pub(crate) struct LiveGuard {
    shared: Arc<SessionShared>,
    discipline: Discipline,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.shared
            .discipline(self.discipline)
            .live
            .fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct SessionShared {
    /// Root termination trigger: external (when configured) or internal.
    pub cancel: CancellationToken,
    pub interval: Duration,
    pub flatten: bool,
    callback: Option<RecordCallback>,
    notification: Option<PathCallback>,
    callback_lock: Option<Mutex<()>>,
    failures: Mutex<BTreeMap<String, String>>,
    abort_on_fail: bool,
    file_limit: Option<usize>,
    snapshot: DisciplineState,
    incremental: DisciplineState,
    exclusions: Mutex<Vec<String>>,
    any_file_seen: AtomicBool,
}

impl SessionShared {
    pub fn new(options: &MonitorOptions) -> Arc<Self> {
        Arc::new(Self {
            cancel: options
                .termination_trigger
                .clone()
                .unwrap_or_default(),
            interval: options.interval,
            flatten: options.flatten_data,
            callback: options.callback.clone(),
            notification: options.notification_callback.clone(),
            callback_lock: options.lock_callbacks.then(|| Mutex::new(())),
            failures: Mutex::new(BTreeMap::new()),
            abort_on_fail: options.terminate_all_on_fail,
            file_limit: options.file_limit,
            snapshot: DisciplineState::new(),
            incremental: DisciplineState::new(),
            exclusions: Mutex::new(Vec::new()),
            any_file_seen: AtomicBool::new(false),
        })
    }

    fn discipline(&self, discipline: Discipline) -> &DisciplineState {
        match discipline {
            Discipline::Snapshot => &self.snapshot,
            Discipline::Incremental => &self.incremental,
        }
    }

    /// Sleep one poll interval, waking early on cancellation. Returns
    /// `false` when the session has been asked to terminate.
    pub async fn tick(&self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.interval) => true,
        }
    }

    /// Claim ownership of a path for one discipline.
    ///
    /// Membership check, cap check and registration happen under one lock so
    /// two discovery workers racing on the same path cannot both spawn.
    pub fn try_claim(self: &Arc<Self>, discipline: Discipline, path: &Path) -> Claim {
        let state = self.discipline(discipline);
        let mut owned = lock(&state.owned);

        if owned.contains(path) {
            return Claim::AlreadyOwned;
        }
        if let Some(limit) = self.file_limit {
            if state.live.load(Ordering::SeqCst) >= limit {
                return Claim::Deferred;
            }
        }

        owned.insert(path.to_path_buf());
        state.live.fetch_add(1, Ordering::SeqCst);
        self.any_file_seen.store(true, Ordering::SeqCst);

        Claim::Claimed(LiveGuard {
            shared: Arc::clone(self),
            discipline,
        })
    }

    /// Store a worker failure. The first write per worker wins; later ones
    /// are dropped. Requests global termination when the session is
    /// configured to abort on any failure.
    pub fn record_failure(&self, worker: &str, message: impl Into<String>) {
        {
            let mut failures = lock(&self.failures);
            failures.entry(worker.to_string()).or_insert_with(|| message.into());
        }
        if self.abort_on_fail && !self.cancel.is_cancelled() {
            error!("detected worker failure, aborting all file monitors");
            self.cancel.cancel();
        }
    }

    pub fn take_failures(&self) -> BTreeMap<String, String> {
        std::mem::take(&mut *lock(&self.failures))
    }

    pub fn push_exclusion(&self, pattern: String) {
        lock(&self.exclusions).push(pattern);
    }

    pub fn exclusions_snapshot(&self) -> Vec<String> {
        lock(&self.exclusions).clone()
    }

    pub fn any_file_seen(&self) -> bool {
        self.any_file_seen.load(Ordering::SeqCst)
    }

    /// Announce the first sighting of a path.
    pub fn notify_sighting(&self, path: &Path) {
        let _guard = self.callback_lock.as_ref().map(lock);
        match &self.notification {
            Some(callback) => callback(path),
            None => info!("found new file '{}'", path.display()),
        }
    }

    /// Deliver one record through the request's callback, falling back to
    /// the session callback. With neither, the record is dropped with a
    /// warning. Honours the callback mutex for the duration of the call.
    pub fn deliver(
        &self,
        spec: &ObservationSpec,
        payload: Payload,
        meta: RecordMeta,
    ) -> anyhow::Result<()> {
        let callback = spec.callback.as_ref().or(self.callback.as_ref());
        let Some(callback) = callback else {
            warn!(
                "changes detected but no callback set for '{}'",
                meta.file_name.display()
            );
            return Ok(());
        };

        let _guard = self.callback_lock.as_ref().map(lock);
        callback(payload, meta)
    }
}

/// Assemble the record envelope for a payload emitted now.
pub(crate) fn record_meta(path: &Path, extras: Extras) -> RecordMeta {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);

    RecordMeta {
        file_name: path.to_path_buf(),
        timestamp,
        extras,
    }
}
