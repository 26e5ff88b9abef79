// File: testing-framework/src/orchestrator/epoch.rs
//
// Scoped override of the process-wide epoch duration.

use std::time::Duration;

use lazy_static::lazy_static;

use super::overrides::{newest, OverrideId, OverrideRegistry};
use crate::node::{epoch_duration, set_epoch_duration};

lazy_static! {
    static ref EPOCH_OVERRIDES: OverrideRegistry<Duration> = OverrideRegistry::new(
        epoch_duration,
        |duration| {
            set_epoch_duration(duration);
        },
        newest,
    );
}

/// Overrides the process-wide epoch duration until dropped
///
/// The newest live guard wins. Once every guard is gone the duration seen
/// before the first one is back in place, whatever the drop order.
#[must_use = "the override is released as soon as the guard is dropped"]
pub struct EpochDurationGuard {
    id: OverrideId,
    duration: Duration,
}

impl EpochDurationGuard {
    pub fn set(duration: Duration) -> Self {
        Self {
            id: EPOCH_OVERRIDES.register(duration),
            duration,
        }
    }

    /// Epoch duration in effect before any live guard
    pub fn baseline() -> Duration {
        EPOCH_OVERRIDES.baseline()
    }

    /// Duration this guard asked for
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for EpochDurationGuard {
    fn drop(&mut self) {
        EPOCH_OVERRIDES.release(self.id);
    }
}
