// File: testing-framework/src/utilities/reporter.rs
//
// Failure reporting
//
// Two tiers: assertion failures are recorded and the test keeps going so
// one run shows every mismatch; invariant violations abort immediately.

use log::error;
use parking_lot::Mutex;

/// Sink for test failures
pub trait TestReporter: Send + Sync {
    /// Record an assertion failure and continue
    fn error(&self, message: String);

    /// Report an invariant violation and abort the test
    fn fatal(&self, message: String) -> !;

    /// Failures recorded so far
    fn failures(&self) -> Vec<String>;

    /// Failures recorded so far, leaving the sink empty
    fn take_failures(&self) -> Vec<String>;
}

/// Default [`TestReporter`]: logs, collects and panics on fatal
#[derive(Default)]
pub struct FailureCollector {
    failures: Mutex<Vec<String>>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TestReporter for FailureCollector {
    fn error(&self, message: String) {
        error!("{}", message);
        self.failures.lock().push(message);
    }

    fn fatal(&self, message: String) -> ! {
        error!("fatal: {}", message);
        panic!("{}", message);
    }

    fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut *self.failures.lock())
    }
}

/// Render a list of failures for a panic message
pub fn format_failures(failures: &[String]) -> String {
    failures
        .iter()
        .enumerate()
        .map(|(i, failure)| format!("{:>3}. {}", i + 1, textwrap::indent(failure, "     ").trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compare an optional error message against the expected one
pub fn expect_error(reporter: &dyn TestReporter, actual: Option<&str>, expected: Option<&str>) {
    if actual != expected {
        reporter.error(format!(
            "unexpected error\n  expected: {}\n       got: {}",
            expected.unwrap_or("<nil>"),
            actual.unwrap_or("<nil>")
        ));
    }
}

/// Compare two possibly multi-line strings
pub fn expect_string(reporter: &dyn TestReporter, actual: &str, expected: &str) {
    if actual != expected {
        reporter.error(format!(
            "strings differ\nexpected:\n{}\ngot:\n{}",
            textwrap::indent(expected, "    "),
            textwrap::indent(actual, "    ")
        ));
    }
}

/// Compare two token amounts
pub fn expect_amount(reporter: &dyn TestReporter, what: &str, actual: u64, expected: u64) {
    if actual != expected {
        reporter.error(format!(
            "{} mismatch: expected {}, got {}",
            what, expected, actual
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_values_record_nothing() {
        let reporter = FailureCollector::new();
        expect_error(&reporter, None, None);
        expect_error(&reporter, Some("boom"), Some("boom"));
        expect_string(&reporter, "\nstorage\nbalance", "\nstorage\nbalance");
        expect_amount(&reporter, "balance", 5, 5);
        assert!(reporter.failures().is_empty());
    }

    #[test]
    fn test_mismatches_are_collected_in_order() {
        let reporter = FailureCollector::new();
        expect_error(&reporter, Some("boom"), None);
        expect_amount(&reporter, "balance", 4, 5);

        let failures = reporter.take_failures();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("expected: <nil>"));
        assert!(failures[0].contains("got: boom"));
        assert_eq!(failures[1], "balance mismatch: expected 5, got 4");
        assert!(reporter.failures().is_empty());
    }

    #[test]
    fn test_string_mismatch_shows_both_sides() {
        let reporter = FailureCollector::new();
        expect_string(&reporter, "a\nb", "a\nc");
        let failure = &reporter.failures()[0];
        assert!(failure.contains("    a\n    c"));
        assert!(failure.contains("    a\n    b"));
    }

    #[test]
    #[should_panic(expected = "no signing key")]
    fn test_fatal_panics() {
        FailureCollector::new().fatal("no signing key".to_string());
    }

    #[test]
    fn test_format_failures_numbers_entries() {
        let rendered = format_failures(&["first".to_string(), "second\nline".to_string()]);
        assert_eq!(rendered, "  1. first\n  2. second\n     line");
    }
}
