// src/watch/tail.rs

//! Incremental file worker: read only the bytes appended since the previous
//! read, split them into complete lines and extract records.
//!
//! The worker keeps a byte offset and a pending-line buffer. Writers
//! frequently flush partial lines; parsing a half line against a regex
//! yields spurious matches, so an unterminated trailing fragment is held
//! back until its newline arrives. Each complete line is therefore parsed
//! exactly once across the worker's lifetime, except across a truncation,
//! where content preceding the truncation point is lost by contract.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, error};

use crate::engine::shared::{record_meta, SessionShared};
use crate::parse::{extract_from_line, extract_mapping, Extras};
use crate::request::ObservationSpec;

/// Splits a byte stream into complete lines, buffering any unterminated
/// trailing fragment until more data arrives.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    pending: Vec<u8>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the complete lines it closed, in order,
    /// without their terminators. A trailing fragment without a newline is
    /// retained for the next push.
    pub fn push(&mut self, delta: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(delta);

        let mut lines = Vec::new();
        while let Some(position) = self.pending.iter().position(|&byte| byte == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=position).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Drop the buffered fragment. Called on truncation: the fragment
    /// preceded the truncation point and is no longer authoritative.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Number of buffered bytes awaiting their newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

pub(crate) struct TailWorker {
    pub path: PathBuf,
    pub spec: Arc<ObservationSpec>,
    pub shared: Arc<SessionShared>,
}

impl TailWorker {
    pub(crate) async fn run(self) {
        let name = self.path.display().to_string();

        self.shared.notify_sighting(&self.path);
        debug!(file = %name, "tail worker started");

        let mut offset: u64 = 0;
        let mut accumulator = LineAccumulator::new();
        let mut last_modified: Option<SystemTime> = None;
        #[cfg(unix)]
        let mut identity: Option<(u64, u64)> = None;

        while self.shared.tick().await {
            let Ok(metadata) = tokio::fs::metadata(&self.path).await else {
                continue;
            };
            let size = metadata.len();
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            #[cfg(unix)]
            {
                let current = file_identity(&metadata);
                if identity.is_some_and(|previous| previous != current) {
                    debug!(file = %name, "file identity changed, treating as rotation");
                    offset = 0;
                    accumulator.discard();
                }
                identity = Some(current);
            }

            if last_modified.is_some_and(|previous| modified <= previous) && size >= offset {
                continue;
            }

            if size < offset {
                debug!(file = %name, "file shrank below read offset, treating as reopen");
                offset = 0;
                accumulator.discard();
            }

            let delta = match read_from(&self.path, offset).await {
                Ok(delta) => delta,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    error!(file = %name, error = %err, "failed to read appended content");
                    self.shared.record_failure(&name, err.to_string());
                    return;
                }
            };
            offset += delta.len() as u64;

            let lines: Vec<String> = accumulator
                .push(&delta)
                .into_iter()
                .filter(|line| {
                    !self
                        .spec
                        .skip_lines
                        .iter()
                        .any(|pattern| pattern.matches(line))
                })
                .collect();

            if lines.is_empty() {
                last_modified = Some(modified);
                continue;
            }

            if let Err(err) = self.emit(&lines, offset) {
                error!(file = %name, error = %err, "failed to process appended content");
                self.shared.record_failure(&name, err.to_string());
                return;
            }

            last_modified = Some(modified);
        }
    }

    /// Parse the surviving lines and deliver records in file-byte order.
    ///
    /// With a custom delta parser the lines are re-joined and handed over in
    /// one call; otherwise each line goes through tracked-value extraction
    /// on its own.
    fn emit(&self, lines: &[String], read_bytes: u64) -> anyhow::Result<()> {
        if let Some(parser) = &self.spec.delta_parser {
            let mut content = lines.join("\n");
            content.push('\n');

            let parsed = parser.parse_delta(&content, &self.spec.parser_args)?;
            let mut extras = parsed.extras.clone();
            extras.insert("read_bytes".to_string(), Value::from(read_bytes));

            for payload in parsed.into_payloads() {
                let Some(record) =
                    extract_mapping(payload, &self.spec.matchers, self.shared.flatten)
                else {
                    continue;
                };
                self.shared
                    .deliver(&self.spec, record, record_meta(&self.path, extras.clone()))?;
            }
        } else {
            for line in lines {
                let Some(record) = extract_from_line(line, &self.spec.matchers) else {
                    continue;
                };
                let mut extras = Extras::new();
                extras.insert("read_bytes".to_string(), Value::from(read_bytes));
                self.shared
                    .deliver(&self.spec, record, record_meta(&self.path, extras))?;
            }
        }
        Ok(())
    }
}

async fn read_from(path: &Path, offset: u64) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }
    let mut delta = Vec::new();
    file.read_to_end(&mut delta).await?;
    Ok(delta)
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.dev(), metadata.ino())
}
