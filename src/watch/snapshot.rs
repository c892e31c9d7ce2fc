// src/watch/snapshot.rs

//! Snapshot file worker: re-parse the whole file whenever its modification
//! time advances.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, error, warn};

use crate::engine::shared::{record_meta, SessionShared};
use crate::errors::MonitorError;
use crate::parse::{extract_mapping, ParsedOutput, ParserRegistry, SnapshotParser};
use crate::request::ObservationSpec;

pub(crate) struct SnapshotWorker {
    pub path: PathBuf,
    pub spec: Arc<ObservationSpec>,
    pub shared: Arc<SessionShared>,
}

impl SnapshotWorker {
    /// Worker loop. Runs until termination is signalled, the request is
    /// static and one read succeeded, or the worker fails.
    ///
    /// A path that disappears after discovery is not a failure: the worker
    /// stays idle and retries on later ticks.
    pub(crate) async fn run(self) {
        let name = self.path.display().to_string();

        let parser = match self.resolve_parser() {
            Ok(parser) => parser,
            Err(err) => {
                warn!(file = %name, error = %err, "snapshot worker has no parser");
                self.shared.record_failure(&name, err.to_string());
                return;
            }
        };

        self.shared.notify_sighting(&self.path);
        debug!(file = %name, "snapshot worker started");

        let mut last_modified: Option<SystemTime> = None;

        while self.shared.tick().await {
            let Ok(metadata) = tokio::fs::metadata(&self.path).await else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if last_modified.is_some_and(|previous| modified <= previous) {
                continue;
            }

            let parsed = match parser.parse_file(&self.path, &self.spec.parser_args) {
                Ok(parsed) => parsed,
                Err(err) => {
                    error!(file = %name, error = %err, "failed to parse file");
                    self.shared.record_failure(&name, err.to_string());
                    return;
                }
            };

            if let Err(err) = self.emit(parsed) {
                error!(file = %name, error = %err, "record callback failed");
                self.shared.record_failure(&name, err.to_string());
                return;
            }

            last_modified = Some(modified);

            if self.spec.static_read {
                debug!(file = %name, "static read complete, worker finished");
                return;
            }
        }
    }

    /// Dispatch order: explicit `file_type` override, then the request's
    /// custom parser, then the registry keyed by the file's suffix.
    fn resolve_parser(&self) -> Result<Arc<dyn SnapshotParser>, MonitorError> {
        let registry = ParserRegistry::shared();

        if let Some(file_type) = &self.spec.file_type {
            return registry
                .lookup(file_type)
                .ok_or_else(|| MonitorError::ParserUnavailable {
                    file_type: file_type.clone(),
                });
        }

        if let Some(parser) = &self.spec.snapshot_parser {
            return Ok(Arc::clone(parser));
        }

        let suffix = self
            .path
            .extension()
            .and_then(|suffix| suffix.to_str())
            .unwrap_or("");
        registry
            .lookup(suffix)
            .ok_or_else(|| MonitorError::ParserUnavailable {
                file_type: suffix.to_string(),
            })
    }

    /// Filter each payload and deliver the surviving records in order.
    fn emit(&self, parsed: ParsedOutput) -> anyhow::Result<()> {
        let extras = parsed.extras.clone();
        for payload in parsed.into_payloads() {
            let Some(record) = extract_mapping(payload, &self.spec.matchers, self.shared.flatten)
            else {
                continue;
            };
            self.shared
                .deliver(&self.spec, record, record_meta(&self.path, extras.clone()))?;
        }
        Ok(())
    }
}
