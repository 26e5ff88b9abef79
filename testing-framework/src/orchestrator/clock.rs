// File: testing-framework/src/orchestrator/clock.rs
//
// Ledger-derived Clock
//
// The harness never reads wall-clock time. "Now" is the timestamp of the
// frontier momentum, so time only moves when the production driver seals
// a new momentum.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nom_common::time::TimestampSeconds;
use parking_lot::Mutex;
use thiserror::Error;

use crate::node::{Chain, ChainError};

/// Clock abstraction trait - harness code depends on this trait
///
/// Components that need "the current time" (diagnostic records, test
/// assertions) take an `Arc<dyn Clock>` instead of calling `Utc::now()`,
/// which keeps every run reproducible.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use nom_testing_framework::orchestrator::clock::{Clock, FrontierClock};
///
/// let clock: Arc<dyn Clock> = Arc::new(FrontierClock::new(chain, genesis.timestamp));
/// let before = clock.now();
/// harness.advance_one().await;
/// assert!(clock.now() > before);
/// ```
pub trait Clock: Send + Sync {
    /// Returns the current logical time
    ///
    /// # Panics
    ///
    /// Implementations panic when time can no longer be observed, e.g.
    /// because the ledger backing them was stopped.
    fn now(&self) -> DateTime<Utc>;
}

/// Errors raised while reading a [`FrontierClock`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The ledger was stopped; its frontier is no longer meaningful
    #[error("clock read after the ledger was stopped")]
    LedgerStopped,

    #[error("timestamp {0} is out of range")]
    OutOfRange(TimestampSeconds),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Clock reading the frontier momentum of a ledger
///
/// Returns the frontier timestamp when the ledger has one, and the last
/// value it returned otherwise (initially the genesis timestamp). Reads
/// after the ledger was stopped fail instead of returning stale time.
pub struct FrontierClock {
    chain: Arc<dyn Chain>,
    last: Mutex<TimestampSeconds>,
}

impl FrontierClock {
    /// Create a clock over `chain`, starting at `genesis_timestamp`
    pub fn new(chain: Arc<dyn Chain>, genesis_timestamp: TimestampSeconds) -> Self {
        Self {
            chain,
            last: Mutex::new(genesis_timestamp),
        }
    }

    /// Current logical time in seconds
    pub fn try_now_seconds(&self) -> Result<TimestampSeconds, ClockError> {
        let mut last = self.last.lock();
        match self.chain.frontier_momentum() {
            Ok(frontier) => {
                *last = frontier.timestamp;
                Ok(frontier.timestamp)
            }
            Err(ChainError::NotInitialized) => Ok(*last),
            Err(ChainError::Stopped) => Err(ClockError::LedgerStopped),
            Err(e) => Err(e.into()),
        }
    }

    /// Current logical time
    pub fn try_now(&self) -> Result<DateTime<Utc>, ClockError> {
        let seconds = self.try_now_seconds()?;
        i64::try_from(seconds)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(ClockError::OutOfRange(seconds))
    }
}

impl Clock for FrontierClock {
    fn now(&self) -> DateTime<Utc> {
        match self.try_now() {
            Ok(now) => now,
            Err(e) => panic!("{}", e),
        }
    }
}
