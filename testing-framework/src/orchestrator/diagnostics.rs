// File: testing-framework/src/orchestrator/diagnostics.rs
//
// Diagnostic Capture
//
// Contract calls are executed by whichever pillar produces the next
// momentum, long after the caller submitted the send block. The capture
// listens to producer diagnostics and keeps the outcome of every embedded
// execution keyed by the hash of the send block it consumed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{trace, warn};
use nom_common::{block::AccountHeader, crypto::Hash};
use parking_lot::Mutex;

use super::clock::Clock;
use crate::node::{DiagnosticEvent, ProducerObserver};

/// Outcome of one embedded execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    /// Contract receive block that consumed the send
    pub identifier: AccountHeader,
    /// Rendered contract error; empty on success
    pub outcome: String,
    /// Logical time at which the outcome was observed
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_empty()
    }
}

/// Append-only map of send-block hash to execution outcome
pub struct DiagnosticCapture {
    clock: Arc<dyn Clock>,
    results: Mutex<HashMap<Hash, OutcomeRecord>>,
}

impl DiagnosticCapture {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            results: Mutex::new(HashMap::new()),
        }
    }

    /// Outcome string recorded for `send_hash`, if its execution was seen
    pub fn outcome(&self, send_hash: &Hash) -> Option<String> {
        self.results
            .lock()
            .get(send_hash)
            .map(|record| record.outcome.clone())
    }

    /// Full record for `send_hash`
    pub fn record(&self, send_hash: &Hash) -> Option<OutcomeRecord> {
        self.results.lock().get(send_hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// Drop every record; only done on harness teardown
    pub(crate) fn clear(&self) {
        self.results.lock().clear();
    }

    fn insert(&self, send_block: &AccountHeader, record: OutcomeRecord) {
        let mut results = self.results.lock();
        if results.contains_key(&send_block.hash) {
            // A send is consumed exactly once; keep the first record
            warn!("duplicate embedded outcome for send-block {}", send_block);
            return;
        }
        results.insert(send_block.hash, record);
    }
}

impl ProducerObserver for DiagnosticCapture {
    fn on_event(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::EmbeddedBlockGenerated {
                identifier,
                send_block,
                returned_error,
            } => {
                let record = OutcomeRecord {
                    identifier: *identifier,
                    outcome: returned_error.clone().unwrap_or_default(),
                    recorded_at: self.clock.now(),
                };
                trace!("captured outcome {:?} for {}", record.outcome, send_block);
                self.insert(send_block, record);
            }
            DiagnosticEvent::MomentumProduced { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nom_common::crypto::hash;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(1_000_000_000, 0).unwrap()
        }
    }

    fn header(seed: &[u8], height: u64) -> AccountHeader {
        AccountHeader {
            hash: hash(seed),
            height,
            ..Default::default()
        }
    }

    fn generated(send: AccountHeader, error: Option<&str>) -> DiagnosticEvent {
        DiagnosticEvent::EmbeddedBlockGenerated {
            identifier: header(b"receive", 1),
            send_block: send,
            returned_error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_records_success_as_empty_outcome() {
        let capture = DiagnosticCapture::new(Arc::new(FixedClock));
        let send = header(b"send", 2);
        capture.on_event(&generated(send, None));

        assert_eq!(capture.outcome(&send.hash), Some(String::new()));
        let record = capture.record(&send.hash).unwrap();
        assert!(record.is_success());
        assert_eq!(record.recorded_at.timestamp(), 1_000_000_000);
    }

    #[test]
    fn test_first_outcome_wins() {
        let capture = DiagnosticCapture::new(Arc::new(FixedClock));
        let send = header(b"send", 2);
        capture.on_event(&generated(send, Some("first")));
        capture.on_event(&generated(send, Some("second")));

        assert_eq!(capture.outcome(&send.hash).as_deref(), Some("first"));
        assert_eq!(capture.len(), 1);
    }

    #[test]
    fn test_ignores_momentum_events_and_unknown_sends() {
        let capture = DiagnosticCapture::new(Arc::new(FixedClock));
        capture.on_event(&DiagnosticEvent::MomentumProduced {
            identifier: Default::default(),
            blocks: 3,
        });
        assert!(capture.is_empty());
        assert_eq!(capture.outcome(&hash(b"missing")), None);
    }

    #[test]
    fn test_clear_empties_the_map() {
        let capture = DiagnosticCapture::new(Arc::new(FixedClock));
        capture.on_event(&generated(header(b"send", 2), Some("boom")));
        capture.clear();
        assert!(capture.is_empty());
    }
}
