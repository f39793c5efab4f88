//! JSONL trails for publish and alarm scenarios.
//!
//! Two sinks: a process-wide tracing subscriber capturing every library event
//! in `target/test-logs/digito_tests.jsonl`, and a per-test [`TestLogger`]
//! recording the scenario's phases next to it.
//!
//! ```ignore
//! #[ctor::ctor]
//! fn setup() {
//!     digito_common::testing::init_global_test_logging();
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};
use std::time::Instant;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

const GLOBAL_LOG_NAME: &str = "digito_tests.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    Setup,
    Execute,
    Verify,
    Teardown,
}

static INIT: Once = Once::new();

/// Install the global test subscriber once per process.
///
/// `DIGITO_TEST_LOG_FILE` overrides the JSONL destination and
/// `DIGITO_TEST_LOG_LEVEL` (default `info`) the level of the Digito crates.
pub fn init_global_test_logging() {
    INIT.call_once(|| {
        let level = std::env::var("DIGITO_TEST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let filter = tracing_subscriber::EnvFilter::try_new(format!(
            "warn,digito={level},digito_common={level}"
        ))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let destination = std::env::var_os("DIGITO_TEST_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| log_dir().join(GLOBAL_LOG_NAME));
        let jsonl = create_file(&destination).map(|file| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
        });
        let compact = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(jsonl)
            .with(compact);
        // Another harness may already own the global default.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// `<target>/test-logs`, resolved once.
fn log_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let target = std::env::var_os("CARGO_TARGET_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                let cwd = std::env::current_dir().ok()?;
                cwd.ancestors()
                    .map(|dir| dir.join("target"))
                    .find(|target| target.is_dir())
            })
            .unwrap_or_else(|| PathBuf::from("target"));
        target.join("test-logs")
    })
}

fn create_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    File::create(path).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestLogEntry {
    pub timestamp: String,
    pub test_name: String,
    pub phase: TestPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub elapsed_ms: u64,
}

/// Per-test phase log, mirrored to `<target>/test-logs/<test_name>.jsonl`.
///
/// Dropping the logger appends a final `TEST PASSED` or `TEST FAILED` entry
/// depending on whether the thread is panicking.
pub struct TestLogger {
    test_name: String,
    started: Instant,
    entries: Mutex<Vec<TestLogEntry>>,
    sink: Option<Mutex<File>>,
}

impl TestLogger {
    pub fn for_test(test_name: &str) -> Self {
        let sink = create_file(&log_dir().join(format!("{test_name}.jsonl"))).map(Mutex::new);
        let logger = Self {
            test_name: test_name.to_string(),
            started: Instant::now(),
            entries: Mutex::new(Vec::new()),
            sink,
        };
        logger.log(TestPhase::Setup, "TEST START");
        logger
    }

    pub fn log(&self, phase: TestPhase, message: impl Into<String>) {
        self.record(phase, message.into(), None);
    }

    /// Log `message` with any serializable value, such as a publish report
    /// or a teardown report.
    pub fn log_value<T: Serialize>(&self, phase: TestPhase, message: impl Into<String>, value: &T) {
        let data = serde_json::to_value(value)
            .unwrap_or_else(|err| serde_json::Value::String(format!("unserializable: {err}")));
        self.record(phase, message.into(), Some(data));
    }

    pub fn entries(&self) -> Vec<TestLogEntry> {
        crate::ports::lock(&self.entries).clone()
    }

    fn record(&self, phase: TestPhase, message: String, data: Option<serde_json::Value>) {
        let entry = TestLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            test_name: self.test_name.clone(),
            phase,
            message,
            data,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        if let Some(sink) = &self.sink
            && let Ok(line) = serde_json::to_string(&entry)
        {
            let _ = writeln!(crate::ports::lock(sink), "{line}");
        }
        crate::ports::lock(&self.entries).push(entry);
    }
}

impl Drop for TestLogger {
    fn drop(&mut self) {
        let verdict = if std::thread::panicking() {
            "TEST FAILED"
        } else {
            "TEST PASSED"
        };
        self.record(TestPhase::Teardown, verdict.to_string(), None);
    }
}
