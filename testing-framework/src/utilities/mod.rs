// File: testing-framework/src/utilities/mod.rs
//
// Testing Utilities
//
// Assertion helpers shared by the harness and by tests written against it.

/// Failure reporting and comparison helpers
pub mod reporter;

// Re-export commonly used utilities
pub use reporter::{
    expect_amount, expect_error, expect_string, format_failures, FailureCollector, TestReporter,
};
