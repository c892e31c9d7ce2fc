// tests/common/mod.rs

#![allow(dead_code)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use parsewatch::{Payload, RecordMeta};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Collects every record delivered to a session for later assertions.
#[derive(Clone, Default)]
pub struct RecordSink {
    records: Arc<Mutex<Vec<(Payload, RecordMeta)>>>,
}

impl RecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record callback storing everything it receives.
    pub fn callback(
        &self,
    ) -> impl Fn(Payload, RecordMeta) -> anyhow::Result<()> + Send + Sync + 'static {
        let records = Arc::clone(&self.records);
        move |payload, meta| {
            records.lock().unwrap().push((payload, meta));
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<Payload> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(payload, _)| payload.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<(Payload, RecordMeta)> {
        self.records.lock().unwrap().clone()
    }
}

pub fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).expect("writing test file");
}

pub fn append_file(path: &Path, content: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("opening test file for append");
    file.write_all(content.as_bytes()).expect("appending to test file");
}
