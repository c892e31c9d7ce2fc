// src/engine/supervisor.rs

//! The monitor supervisor: session lifecycle and failure aggregation.
//!
//! The supervisor launches one discovery worker per observation request and
//! then waits for a termination cause: the cancellation token (external
//! trigger, explicit `terminate`, abort-on-failure), the timeout, or
//! natural completion (every discovery worker exhausted its request). On
//! termination it joins the whole worker tree, fans out the configured
//! downstream triggers — strictly after the join — and assembles the
//! aggregated failure report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::shared::SessionShared;
use crate::errors::SessionFailure;
use crate::options::MessageCallback;
use crate::request::ObservationSpec;
use crate::watch::discovery::DiscoveryWorker;

pub(crate) struct Supervisor {
    pub shared: Arc<SessionShared>,
    pub specs: Vec<Arc<ObservationSpec>>,
    pub timeout: Option<Duration>,
    pub subprocess_triggers: Vec<CancellationToken>,
    pub exception_callback: Option<MessageCallback>,
}

impl Supervisor {
    /// Run the session to completion and return the collected per-worker
    /// failures.
    pub(crate) async fn run(self) -> BTreeMap<String, String> {
        info!("file monitor supervisor started");

        if let Some(timeout) = self.timeout {
            spawn_timer(timeout, self.shared.cancel.clone());
        }

        let discovery: Vec<JoinHandle<()>> = self
            .specs
            .iter()
            .map(|spec| {
                let worker = DiscoveryWorker {
                    spec: Arc::clone(spec),
                    shared: Arc::clone(&self.shared),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        loop {
            if self.shared.cancel.is_cancelled() {
                break;
            }
            if discovery.iter().all(|handle| handle.is_finished()) {
                debug!("all discovery workers finished, terminating naturally");
                break;
            }
            if !self.shared.tick().await {
                break;
            }
        }

        // Stop every worker still polling; each discovery worker joins its
        // own file workers before returning.
        self.shared.cancel.cancel();
        for handle in discovery {
            let _ = handle.await;
        }

        if !self.shared.any_file_seen() {
            warn!("no files were processed during this session");
        }

        // Downstream triggers fire strictly after all workers have joined.
        for trigger in &self.subprocess_triggers {
            trigger.cancel();
        }

        let failures = self.shared.take_failures();
        if !failures.is_empty() {
            if let Some(callback) = &self.exception_callback {
                callback(&SessionFailure::new(failures.clone()).to_string());
            }
        }

        info!("file monitor supervisor exiting");
        failures
    }
}

/// Cancel the termination trigger once the timeout elapses, unless the
/// session terminated on its own first.
fn spawn_timer(timeout: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        debug!("using timeout of {timeout:?}");
        tokio::time::sleep(timeout).await;
        if !cancel.is_cancelled() {
            info!("file monitor timeout reached after {timeout:?}");
            cancel.cancel();
        }
    });
}
