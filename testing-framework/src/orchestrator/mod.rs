// File: testing-framework/src/orchestrator/mod.rs
//
// Orchestrator Module - Deterministic Infrastructure
//
// Everything the harness needs to keep a run reproducible: a clock derived
// from the ledger, scoped overrides of process-wide settings, and the
// capture of producer diagnostics and log output.

/// Ledger-derived clock
pub mod clock;
/// Capture of embedded execution outcomes
pub mod diagnostics;
/// Scoped override of the process-wide epoch duration
pub mod epoch;
/// Log output capture for assertions
pub mod log_capture;
/// Scoped log verbosity
pub mod logging;
/// Overlapping overrides of process-wide values
pub mod overrides;

// Re-export key types for convenience
pub use clock::{Clock, ClockError, FrontierClock};
pub use diagnostics::{DiagnosticCapture, OutcomeRecord};
pub use epoch::EpochDurationGuard;
pub use log_capture::{try_init_test_logger, LogCapture, LogCaptureError};
pub use logging::{LogConfig, LogLevelGuard};
pub use overrides::{OverrideId, OverrideRegistry};
