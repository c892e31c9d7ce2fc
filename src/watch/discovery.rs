// src/watch/discovery.rs

//! Discovery worker: one per observation request.
//!
//! Every tick the request's glob patterns are re-expanded against the
//! filesystem; each newly matching path that is not excluded and not
//! already owned gets a file worker, subject to the per-discipline
//! concurrency cap. The discovery worker owns the file workers it spawns
//! and joins them before returning.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::engine::shared::{Claim, LiveGuard, SessionShared};
use crate::request::{Discipline, ObservationSpec};
use crate::watch::patterns;
use crate::watch::snapshot::SnapshotWorker;
use crate::watch::tail::TailWorker;

pub(crate) struct DiscoveryWorker {
    pub spec: Arc<ObservationSpec>,
    pub shared: Arc<SessionShared>,
}

impl DiscoveryWorker {
    pub(crate) async fn run(self) {
        let name = self.spec.discovery_name();
        debug!(worker = %name, "discovery worker started");

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        let mut spawned_any = false;

        while self.shared.tick().await {
            let matches = match patterns::expand(&self.spec.globs) {
                Ok(matches) => matches,
                Err(err) => {
                    error!(worker = %name, error = %err, "glob expansion failed");
                    self.shared.record_failure(&name, err.to_string());
                    break;
                }
            };

            let exclusions = self.shared.exclusions_snapshot();
            let excluded = match patterns::expand(&exclusions) {
                Ok(excluded) => excluded,
                Err(err) => {
                    error!(worker = %name, error = %err, "exclusion expansion failed");
                    self.shared.record_failure(&name, err.to_string());
                    break;
                }
            };

            // True when this tick neither spawned a worker nor had to defer
            // one: every matched path is settled.
            let mut settled = true;

            for path in matches {
                if excluded.contains(&path) {
                    continue;
                }

                match self.shared.try_claim(self.spec.discipline, &path) {
                    Claim::AlreadyOwned => {}
                    Claim::Deferred => {
                        warn!(
                            file = %path.display(),
                            "file limit reached, deferring observation"
                        );
                        settled = false;
                    }
                    Claim::Claimed(guard) => {
                        settled = false;
                        spawned_any = true;
                        workers.push(self.spawn_worker(path, guard));
                    }
                }
            }

            // A request whose every file is read once (snapshot + static)
            // is exhausted when all spawned workers have finished and the
            // latest expansion found nothing new to observe.
            if self.spec.static_read
                && spawned_any
                && settled
                && workers.iter().all(|handle| handle.is_finished())
            {
                debug!(worker = %name, "all static reads complete, discovery finished");
                break;
            }
        }

        for handle in workers {
            let _ = handle.await;
        }
        debug!(worker = %name, "discovery worker exiting");
    }

    fn spawn_worker(&self, path: std::path::PathBuf, guard: LiveGuard) -> JoinHandle<()> {
        let spec = Arc::clone(&self.spec);
        let shared = Arc::clone(&self.shared);

        match self.spec.discipline {
            Discipline::Snapshot => tokio::spawn(async move {
                let _guard = guard;
                SnapshotWorker { path, spec, shared }.run().await;
            }),
            Discipline::Incremental => tokio::spawn(async move {
                let _guard = guard;
                TailWorker { path, spec, shared }.run().await;
            }),
        }
    }
}
