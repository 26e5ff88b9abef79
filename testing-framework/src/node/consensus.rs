// File: testing-framework/src/node/consensus.rs
//
// Producer selection
//
// Every slot of `MOMENTUM_SLOT_DURATION` seconds belongs to exactly one
// pillar. Pillars are shuffled once per epoch and then assigned round-robin
// to the slots of that epoch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::trace;
use nom_common::{crypto::Address, time::TimestampSeconds};

use super::{
    error::ConsensusError,
    genesis::Genesis,
    lifecycle::{ComponentState, Lifecycle},
    Consensus,
};

/// Length of one momentum slot, in seconds
pub const MOMENTUM_SLOT_DURATION: TimestampSeconds = 10;

/// Epoch length used when nothing overrides it
pub const DEFAULT_EPOCH_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

static EPOCH_DURATION_SECS: AtomicU64 = AtomicU64::new(DEFAULT_EPOCH_DURATION.as_secs());

/// Process-wide epoch duration, the default for consensus instances built
/// without an explicit one
pub fn epoch_duration() -> Duration {
    Duration::from_secs(EPOCH_DURATION_SECS.load(Ordering::SeqCst))
}

/// Replace the process-wide epoch duration, returning the previous value.
///
/// Values below one slot are clamped to one slot.
pub fn set_epoch_duration(duration: Duration) -> Duration {
    let secs = clamp_epoch_secs(duration);
    Duration::from_secs(EPOCH_DURATION_SECS.swap(secs, Ordering::SeqCst))
}

fn clamp_epoch_secs(duration: Duration) -> u64 {
    duration.as_secs().max(MOMENTUM_SLOT_DURATION)
}

/// Deterministic election over the genesis pillar set.
pub struct ElectionConsensus {
    genesis_timestamp: TimestampSeconds,
    pillars: Vec<Address>,
    epoch_secs: u64,
    lifecycle: Lifecycle,
}

impl ElectionConsensus {
    /// Build from a genesis with a fixed epoch length
    ///
    /// Epochs shorter than one slot are clamped to one slot.
    pub fn new(genesis: &Genesis, epoch: Duration) -> Self {
        Self {
            genesis_timestamp: genesis.timestamp,
            pillars: genesis.pillars.clone(),
            epoch_secs: clamp_epoch_secs(epoch),
            lifecycle: Lifecycle::new("consensus"),
        }
    }

    /// Epoch length this instance was built with
    pub fn epoch_duration(&self) -> Duration {
        Duration::from_secs(self.epoch_secs)
    }

    /// Pillars in the order they produce during `epoch`
    pub fn epoch_order(&self, epoch: u64) -> Vec<Address> {
        let mut ordered: Vec<(blake3::Hash, Address)> = self
            .pillars
            .iter()
            .map(|address| {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&epoch.to_be_bytes());
                hasher.update(address.as_bytes());
                (hasher.finalize(), *address)
            })
            .collect();
        ordered.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        ordered.into_iter().map(|(_, address)| address).collect()
    }

    fn ensure_readable(&self) -> Result<(), ConsensusError> {
        match self.lifecycle.state() {
            ComponentState::Created => Err(ConsensusError::NotInitialized),
            ComponentState::Stopped => Err(ConsensusError::Stopped),
            ComponentState::Initialized | ComponentState::Running => Ok(()),
        }
    }
}

impl Consensus for ElectionConsensus {
    fn init(&self) -> Result<(), ConsensusError> {
        self.lifecycle.init()?;
        Ok(())
    }

    fn start(&self) -> Result<(), ConsensusError> {
        self.lifecycle.start()?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ConsensusError> {
        self.lifecycle.stop()?;
        Ok(())
    }

    fn slot_duration(&self) -> TimestampSeconds {
        MOMENTUM_SLOT_DURATION
    }

    fn momentum_producer(
        &self,
        slot_start: TimestampSeconds,
    ) -> Result<Option<Address>, ConsensusError> {
        self.ensure_readable()?;
        if self.pillars.is_empty() || slot_start <= self.genesis_timestamp {
            return Ok(None);
        }

        // Slot 0 is the first slot after genesis
        let elapsed = slot_start - self.genesis_timestamp - 1;
        let epoch = elapsed / self.epoch_secs;
        let slot_in_epoch = (elapsed % self.epoch_secs) / MOMENTUM_SLOT_DURATION;

        let order = self.epoch_order(epoch);
        let producer = order[(slot_in_epoch % order.len() as u64) as usize];
        trace!(
            "slot {} (epoch {}, index {}) belongs to {}",
            slot_start,
            epoch,
            slot_in_epoch,
            producer
        );
        Ok(Some(producer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::genesis::GENESIS_TIMESTAMP;

    fn running(genesis: &Genesis) -> ElectionConsensus {
        let consensus = ElectionConsensus::new(genesis, DEFAULT_EPOCH_DURATION);
        consensus.init().unwrap();
        consensus.start().unwrap();
        consensus
    }

    #[test]
    fn test_no_producer_at_or_before_genesis() {
        let consensus = running(&Genesis::embedded());
        assert_eq!(consensus.momentum_producer(GENESIS_TIMESTAMP).unwrap(), None);
        assert_eq!(consensus.momentum_producer(0).unwrap(), None);
    }

    #[test]
    fn test_no_producer_without_pillars() {
        let genesis = Genesis {
            pillars: Vec::new(),
            ..Genesis::embedded()
        };
        let consensus = running(&genesis);
        let slot = GENESIS_TIMESTAMP + MOMENTUM_SLOT_DURATION;
        assert_eq!(consensus.momentum_producer(slot).unwrap(), None);
    }

    #[test]
    fn test_selection_is_deterministic_and_elected() {
        let genesis = Genesis::embedded();
        let a = running(&genesis);
        let b = running(&genesis);
        for i in 1..50 {
            let slot = GENESIS_TIMESTAMP + i * MOMENTUM_SLOT_DURATION;
            let producer = a.momentum_producer(slot).unwrap().unwrap();
            assert_eq!(b.momentum_producer(slot).unwrap(), Some(producer));
            assert!(genesis.pillars.contains(&producer));
        }
    }

    #[test]
    fn test_every_pillar_produces_within_an_epoch() {
        let genesis = Genesis::embedded();
        let consensus = running(&genesis);
        let mut seen: Vec<Address> = (1..=genesis.pillars.len() as u64)
            .map(|i| {
                consensus
                    .momentum_producer(GENESIS_TIMESTAMP + i * MOMENTUM_SLOT_DURATION)
                    .unwrap()
                    .unwrap()
            })
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), genesis.pillars.len());
    }

    #[test]
    fn test_order_reshuffles_between_epochs() {
        let genesis = Genesis::embedded();
        let consensus = ElectionConsensus::new(&genesis, DEFAULT_EPOCH_DURATION);

        let orders: Vec<Vec<Address>> = (0..20).map(|epoch| consensus.epoch_order(epoch)).collect();
        for order in &orders {
            let mut sorted = order.clone();
            sorted.sort();
            let mut expected = genesis.pillars.clone();
            expected.sort();
            assert_eq!(sorted, expected);
        }
        assert!(orders.iter().any(|order| *order != genesis.pillars));
        assert!(orders.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn test_epoch_is_fixed_at_construction() {
        let genesis = Genesis::embedded();
        let short = ElectionConsensus::new(&genesis, Duration::from_secs(60));
        assert_eq!(short.epoch_duration(), Duration::from_secs(60));

        let clamped = ElectionConsensus::new(&genesis, Duration::from_secs(1));
        assert_eq!(clamped.epoch_duration(), Duration::from_secs(MOMENTUM_SLOT_DURATION));
    }

    #[test]
    fn test_queries_rejected_after_stop() {
        let consensus = running(&Genesis::embedded());
        consensus.stop().unwrap();
        assert_eq!(
            consensus.momentum_producer(GENESIS_TIMESTAMP + 10),
            Err(ConsensusError::Stopped)
        );
    }
}
