//! Production driver - advances the ledger one slot at a time

use log::debug;
use nom_common::{block::Momentum, crypto::Address, time::TimestampSeconds};

use super::harness::TestHarness;
use crate::node::{Chain, Consensus, Producer, ProducerEvent};

/// What happened to one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// An owned pillar sealed the slot
    Produced { momentum: Momentum },
    /// The slot belongs to a pillar this harness does not own
    Skipped {
        producer: Address,
        slot_start: TimestampSeconds,
    },
}

impl SlotOutcome {
    /// Produced momentum, if any
    pub fn momentum(&self) -> Option<&Momentum> {
        match self {
            SlotOutcome::Produced { momentum } => Some(momentum),
            SlotOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, SlotOutcome::Produced { .. })
    }
}

impl TestHarness {
    /// Produce the slot right after the frontier momentum
    ///
    /// Asks consensus which pillar owns the slot starting one slot duration
    /// after the frontier timestamp. When this harness owns that pillar the
    /// production step runs to completion before this returns; otherwise
    /// the slot is skipped and the ledger is left untouched.
    ///
    /// # Panics
    ///
    /// Panics when no producer is authorized for the slot, when the
    /// production step fails or exceeds the configured timeout, or when the
    /// harness is not running.
    pub async fn advance_one(&self) -> SlotOutcome {
        let components = self.running("advance production");

        let frontier = self.fatal_on_error("read frontier momentum", components.chain.frontier_momentum());
        let slot_duration = components.consensus.slot_duration();
        let slot_start = frontier.timestamp + slot_duration;

        let producer = match self.fatal_on_error(
            "query momentum producer",
            components.consensus.momentum_producer(slot_start),
        ) {
            Some(producer) => producer,
            None => self
                .reporter()
                .fatal(format!("no producer is authorized for the slot starting at {}", slot_start)),
        };

        let pillar = match components
            .pillars
            .iter()
            .find(|pillar| pillar.coinbase() == Some(producer))
        {
            Some(pillar) => pillar.clone(),
            None => {
                debug!("skipping slot {}: {} is not owned", slot_start, producer);
                return SlotOutcome::Skipped {
                    producer,
                    slot_start,
                };
            }
        };

        let handle = pillar.process(ProducerEvent {
            producer,
            start_time: slot_start,
            end_time: slot_start + slot_duration,
        });
        let result = match self.config.production_timeout() {
            Some(timeout) => handle.wait_timeout(timeout).await,
            None => handle.wait().await,
        };

        match self.fatal_on_error("momentum production failed", result) {
            Some(momentum) => {
                debug!(
                    "advanced to momentum height={} timestamp={}",
                    momentum.height, momentum.timestamp
                );
                SlotOutcome::Produced { momentum }
            }
            None => self
                .reporter()
                .fatal(format!("pillar {} declined its own slot {}", producer, slot_start)),
        }
    }

    /// Produce until the frontier momentum reaches `target_height`
    ///
    /// Returns the number of momentums produced; zero when the frontier is
    /// already at or past the target.
    ///
    /// # Panics
    ///
    /// A skipped slot leaves the frontier where it was, so every later
    /// attempt would pick the same slot again. The first skip is fatal.
    pub async fn advance_to(&self, target_height: u64) -> usize {
        let mut produced = 0;
        while self.frontier_height() < target_height {
            match self.advance_one().await {
                SlotOutcome::Produced { .. } => produced += 1,
                SlotOutcome::Skipped {
                    producer,
                    slot_start,
                } => self.reporter().fatal(format!(
                    "cannot reach momentum height {}: slot {} belongs to {}, which this harness does not own",
                    target_height, slot_start, producer
                )),
            }
        }
        produced
    }
}
