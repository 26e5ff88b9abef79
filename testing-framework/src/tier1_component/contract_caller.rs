//! Deferred contract-call verification
//!
//! An embedded contract runs when a pillar produces the next momentum, not
//! when the caller submits the send. `call_contract` returns a handle that
//! looks the outcome up in the harness diagnostics once production ran.

use std::sync::Arc;

use nom_common::block::{AccountBlock, AccountHeader};
use thiserror::Error;

use super::{harness::TestHarness, injector::SKIP_VM_CHANGES};
use crate::orchestrator::DiagnosticCapture;
use crate::utilities::{expect_error, TestReporter};

/// Resolution failure of a [`ContractCallHandle`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// No pillar consumed the send yet
    #[error("can't find the outcome of send-block {0}. Maybe the send-block is not in a momentum yet or the test doesn't end with an advance_one()?")]
    NotYetResolved(AccountHeader),

    /// The contract returned an error
    #[error("{0}")]
    Failed(String),
}

/// Lazily resolved outcome of one contract call
#[derive(Clone)]
pub struct ContractCallHandle {
    send_block: AccountHeader,
    capture: Arc<DiagnosticCapture>,
}

impl ContractCallHandle {
    /// Send block carrying the call
    pub fn send_block(&self) -> AccountHeader {
        self.send_block
    }

    /// Outcome of the call as seen so far
    pub fn resolve(&self) -> Result<(), CallError> {
        match self.capture.outcome(&self.send_block.hash) {
            None => Err(CallError::NotYetResolved(self.send_block)),
            Some(outcome) if outcome.is_empty() => Ok(()),
            Some(outcome) => Err(CallError::Failed(outcome)),
        }
    }

    /// Record an assertion failure unless the call ended with `expected`
    /// (`None` meaning success)
    pub fn expect(&self, reporter: &dyn TestReporter, expected: Option<&str>) {
        match self.resolve() {
            Ok(()) => expect_error(reporter, None, expected),
            Err(CallError::Failed(outcome)) => expect_error(reporter, Some(outcome.as_str()), expected),
            Err(err @ CallError::NotYetResolved(_)) => reporter.error(err.to_string()),
        }
    }
}

impl TestHarness {
    /// Submit a call to the embedded contract at `template.to_address`
    ///
    /// The template is submitted like [`TestHarness::submit_send`] without
    /// a state-diff check.
    ///
    /// # Panics
    ///
    /// Panics if `to_address` is not an embedded contract address or the
    /// send block itself is rejected.
    pub fn call_contract(&self, template: AccountBlock) -> ContractCallHandle {
        if !template.to_address.is_embedded() {
            self.reporter().fatal(format!(
                "call_contract requires an embedded contract address, got {}",
                template.to_address
            ));
        }

        let block = match self.submit_send(template, None, SKIP_VM_CHANGES) {
            Some(block) => block,
            None => self
                .reporter()
                .fatal("contract call send-block was rejected".to_string()),
        };

        ContractCallHandle {
            send_block: block.header(),
            capture: self.capture.clone(),
        }
    }
}
