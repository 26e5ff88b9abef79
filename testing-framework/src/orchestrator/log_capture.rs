// File: testing-framework/src/orchestrator/log_capture.rs
//
// Capture of log output for later assertions
//
// The `log` facade accepts a single global logger. `try_init_test_logger`
// installs one that prints through `env_logger` and also copies every
// record to the live captures whose target it falls under.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Once};

use lazy_static::lazy_static;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use super::logging::LogLevelGuard;
use crate::utilities::{expect_string, TestReporter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogCaptureError {
    #[error("a different logger is already installed; call try_init_test_logger before any other logger")]
    ForeignLogger,
}

struct Sink {
    id: u64,
    target: String,
    level: LevelFilter,
    lines: Arc<Mutex<Vec<String>>>,
}

impl Sink {
    fn accepts(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && target_matches(&self.target, metadata.target())
    }
}

lazy_static! {
    static ref SINKS: RwLock<Vec<Sink>> = RwLock::new(Vec::new());
}

static INSTALL: Once = Once::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);
static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(0);

// `a::b` covers `a::b` and `a::b::c`, not `a::bc`
fn target_matches(prefix: &str, target: &str) -> bool {
    match target.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

struct TestLogger {
    inner: env_logger::Logger,
}

impl Log for TestLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata) || SINKS.read().iter().any(|sink| sink.accepts(metadata))
    }

    fn log(&self, record: &Record) {
        self.inner.log(record);
        for sink in SINKS.read().iter() {
            if sink.accepts(record.metadata()) {
                sink.lines.lock().push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the capturing test logger
///
/// Printing follows `RUST_LOG` like `env_logger::try_init`. Calling this
/// again is a no-op; it fails when some other logger got installed first.
pub fn try_init_test_logger() -> Result<(), LogCaptureError> {
    INSTALL.call_once(|| {
        let inner = env_logger::Builder::from_default_env()
            .is_test(true)
            .build();
        let level = inner.filter();
        if log::set_boxed_logger(Box::new(TestLogger { inner })).is_ok() {
            log::set_max_level(level);
            INSTALLED.store(true, Ordering::SeqCst);
        }
    });

    if INSTALLED.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(LogCaptureError::ForeignLogger)
    }
}

/// Records logged under one target while the capture is alive
///
/// The capture raises the global level to its own for as long as it lives,
/// so a silenced harness still produces the lines it collects.
pub struct LogCapture {
    id: u64,
    target: String,
    lines: Arc<Mutex<Vec<String>>>,
    _level: LogLevelGuard,
}

impl LogCapture {
    /// Start collecting messages of `target` (and its submodules) at `level`
    /// or more severe
    pub fn start(target: &str, level: LevelFilter) -> Result<Self, LogCaptureError> {
        try_init_test_logger()?;

        let id = NEXT_SINK_ID.fetch_add(1, Ordering::SeqCst);
        let lines = Arc::new(Mutex::new(Vec::new()));
        SINKS.write().push(Sink {
            id,
            target: target.to_string(),
            level,
            lines: lines.clone(),
        });

        Ok(Self {
            id,
            target: target.to_string(),
            lines,
            _level: LogLevelGuard::set(level),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Every captured message, one per line
    pub fn contents(&self) -> String {
        self.lines.lock().join("\n")
    }

    /// Record a failure unless the captured output equals `expected`
    pub fn expect(&self, reporter: &dyn TestReporter, expected: &str) {
        expect_string(reporter, &self.contents(), expected);
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        SINKS.write().retain(|sink| sink.id != self.id);
    }
}
