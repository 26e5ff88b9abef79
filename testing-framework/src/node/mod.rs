// File: testing-framework/src/node/mod.rs
//
// In-process node components driven by the harness
//
// The harness only talks to the ledger, producer selection and producers
// through the traits below. The concrete types in this module are compact
// in-memory implementations of those contracts.

/// In-memory ledger of account chains and momentums
pub mod chain;
/// Per-slot producer selection
pub mod consensus;
/// Embedded contracts executed by the supervisor
pub mod embedded;
/// Typed errors of the node components
pub mod error;
/// Deterministic genesis state and test keys
pub mod genesis;
/// Shared init/start/stop state machine
pub mod lifecycle;
/// Momentum producer
pub mod pillar;
/// Template completion and embedded execution
pub mod supervisor;

use std::time::Duration;

use nom_common::{
    block::{AccountBlock, AccountBlockTransaction, AccountHeader, HashHeight, Momentum},
    crypto::{Address, Hash, KeyPair},
    time::TimestampSeconds,
    token::TokenStandard,
};
use tokio::task::JoinHandle;

pub use chain::MemoryChain;
pub use consensus::{
    epoch_duration, set_epoch_duration, ElectionConsensus, DEFAULT_EPOCH_DURATION,
    MOMENTUM_SLOT_DURATION,
};
pub use embedded::{EmbeddedError, VAULT_ADDRESS};
pub use error::{ChainError, ConsensusError, ProductionError, VmError};
pub use genesis::Genesis;
pub use lifecycle::{ComponentState, Lifecycle, LifecycleError};
pub use pillar::{Pillar, LOG_TARGET as PILLAR_LOG_TARGET};
pub use supervisor::{EmbeddedExecution, Supervisor};

/// Ledger storage: per-account chains plus the momentum sequence.
pub trait Chain: Send + Sync {
    /// Allocate state and insert the genesis momentum
    fn init(&self) -> Result<(), ChainError>;
    /// Accept inserts
    fn start(&self) -> Result<(), ChainError>;
    /// Reject every further call
    fn stop(&self) -> Result<(), ChainError>;

    /// Latest momentum
    fn frontier_momentum(&self) -> Result<Momentum, ChainError>;
    /// Latest block of an account chain, if the account has any
    fn frontier_account_block(&self, address: &Address) -> Result<Option<AccountBlock>, ChainError>;
    /// Block of an account chain at the given height
    fn account_block_by_height(
        &self,
        address: &Address,
        height: u64,
    ) -> Result<Option<AccountBlock>, ChainError>;
    /// Block by content hash, across all accounts
    fn account_block_by_hash(&self, hash: &Hash) -> Result<Option<AccountBlock>, ChainError>;
    /// Balance of an account; `None` when the account never held the token
    fn balance(
        &self,
        address: &Address,
        token_standard: &TokenStandard,
    ) -> Result<Option<u64>, ChainError>;
    /// Raw storage value of an account
    fn storage_value(&self, address: &Address, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError>;
    /// Whether a send block was already consumed by a receive
    fn is_received(&self, send_hash: &Hash) -> Result<bool, ChainError>;

    /// Append a completed block and apply its changes
    fn insert_account_block(&self, transaction: AccountBlockTransaction) -> Result<(), ChainError>;
    /// Append a momentum confirming uncommitted blocks
    fn insert_momentum(&self, momentum: Momentum) -> Result<(), ChainError>;
    /// Blocks not referenced by any momentum yet, in insertion order
    fn uncommitted_account_blocks(&self) -> Result<Vec<AccountHeader>, ChainError>;
    /// Sends addressed to embedded contracts still waiting for their receive
    fn unreceived_embedded_sends(&self) -> Result<Vec<AccountBlock>, ChainError>;
}

/// Producer selection.
pub trait Consensus: Send + Sync {
    fn init(&self) -> Result<(), ConsensusError>;
    fn start(&self) -> Result<(), ConsensusError>;
    fn stop(&self) -> Result<(), ConsensusError>;

    /// Length of one momentum slot, in seconds
    fn slot_duration(&self) -> TimestampSeconds;
    /// Producer authorized for the slot starting at `slot_start`
    fn momentum_producer(&self, slot_start: TimestampSeconds)
        -> Result<Option<Address>, ConsensusError>;
}

/// Slot assignment handed to a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerEvent {
    pub producer: Address,
    pub start_time: TimestampSeconds,
    pub end_time: TimestampSeconds,
}

/// A momentum producer.
pub trait Producer: Send + Sync {
    fn init(&self) -> Result<(), ProductionError>;
    fn start(&self) -> Result<(), ProductionError>;
    fn stop(&self) -> Result<(), ProductionError>;

    /// Install the key this producer signs momentums with
    fn set_coinbase(&self, key: KeyPair);
    /// Address of the installed key
    fn coinbase(&self) -> Option<Address>;
    /// Run the production step for a slot on a separate task
    fn process(&self, event: ProducerEvent) -> ProductionHandle;
}

/// Sink for what the producer inserts into the ledger.
pub trait Broadcaster: Send + Sync {
    fn create_account_block(&self, transaction: AccountBlockTransaction) -> Result<(), ChainError>;
    fn create_momentum(&self, momentum: Momentum) -> Result<(), ChainError>;
}

/// Structured diagnostics emitted while producing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// An embedded contract consumed a send block.
    /// `returned_error` is `None` when the contract accepted the call.
    EmbeddedBlockGenerated {
        identifier: AccountHeader,
        send_block: AccountHeader,
        returned_error: Option<String>,
    },
    /// A momentum was inserted
    MomentumProduced { identifier: HashHeight, blocks: usize },
}

/// Observer of producer diagnostics.
pub trait ProducerObserver: Send + Sync {
    fn on_event(&self, event: &DiagnosticEvent);
}

/// Result of one production step: the inserted momentum, or `None`
/// when the producer was not the one assigned to the slot.
pub type ProductionResult = Result<Option<Momentum>, ProductionError>;

/// Join handle over a running production step.
pub struct ProductionHandle {
    inner: JoinHandle<ProductionResult>,
}

impl ProductionHandle {
    pub(crate) fn new(inner: JoinHandle<ProductionResult>) -> Self {
        Self { inner }
    }

    /// Handle that is already resolved
    pub(crate) fn ready(result: ProductionResult) -> Self {
        Self::new(tokio::spawn(async move { result }))
    }

    /// Block until the production step finished.
    ///
    /// A panic inside the step is resumed on the caller.
    pub async fn wait(self) -> ProductionResult {
        match self.inner.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ProductionError::Cancelled),
        }
    }

    /// Like [`ProductionHandle::wait`], but gives up after `timeout`.
    ///
    /// The step keeps running detached when the timeout fires.
    pub async fn wait_timeout(self, timeout: Duration) -> ProductionResult {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(ProductionError::Timeout(timeout)),
        }
    }
}
