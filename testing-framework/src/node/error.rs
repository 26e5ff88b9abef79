// File: testing-framework/src/node/error.rs
//
// Typed errors of the in-process node components.

use std::time::Duration;

use nom_common::{
    block::{AccountHeader, BlockType},
    crypto::{Address, Hash},
    time::TimestampSeconds,
};
use thiserror::Error;

use super::lifecycle::LifecycleError;

/// Errors raised by the ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("chain is not initialized")]
    NotInitialized,

    #[error("chain is stopped")]
    Stopped,

    #[error("account-block height mismatch for {address}: expected {expected}, got {got}")]
    InvalidHeight {
        address: Address,
        expected: u64,
        got: u64,
    },

    #[error("account-block previous hash mismatch: expected {expected}, got {got}")]
    InvalidPreviousHash { expected: Hash, got: Hash },

    #[error("account-block hash mismatch: expected {expected}, got {got}")]
    InvalidHash { expected: Hash, got: Hash },

    #[error("invalid signature for block {0}")]
    InvalidSignature(Hash),

    #[error("account-block {0} already exists")]
    DuplicateBlock(Hash),

    #[error("from-block {0} was already received")]
    AlreadyReceived(Hash),

    #[error("momentum height mismatch: expected {expected}, got {got}")]
    InvalidMomentumHeight { expected: u64, got: u64 },

    #[error("momentum previous hash mismatch: expected {expected}, got {got}")]
    InvalidMomentumPrevious { expected: Hash, got: Hash },

    #[error("momentum timestamp {got} is not after frontier timestamp {frontier}")]
    InvalidMomentumTimestamp {
        frontier: TimestampSeconds,
        got: TimestampSeconds,
    },

    #[error("momentum content references unknown or confirmed block {0}")]
    InvalidMomentumContent(AccountHeader),

    #[error("balance overflow for {0}")]
    BalanceOverflow(Address),
}

/// Errors raised by producer selection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("consensus is not initialized")]
    NotInitialized,

    #[error("consensus is stopped")]
    Stopped,
}

/// Errors raised while completing a block template or executing an embedded contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("to-address is empty")]
    MissingToAddress,

    #[error("block type {0:?} can not be generated from a template")]
    InvalidBlockType(BlockType),

    #[error("template address {template} does not match signer {signer}")]
    SignerMismatch { template: Address, signer: Address },

    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u64, have: u64 },

    #[error("balance overflow")]
    BalanceOverflow,

    #[error("from-block {0} does not exist")]
    MissingFromBlock(Hash),

    #[error("from-block {0} is not a send block")]
    NotASendBlock(Hash),

    #[error("from-block {hash} is addressed to {expected}, not {got}")]
    InvalidReceiver {
        hash: Hash,
        expected: Address,
        got: Address,
    },

    #[error("from-block {0} was already received")]
    AlreadyReceived(Hash),

    #[error("embedded contract {0} does not exist")]
    UnknownContract(Address),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Errors raised by a producer's production step.
#[derive(Debug, Error)]
pub enum ProductionError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("producer has no coinbase key")]
    NoCoinbase,

    #[error("{producer} is not authorized to produce the slot starting at {slot_start}")]
    NotAuthorized {
        producer: Address,
        slot_start: TimestampSeconds,
    },

    #[error("slot starting at {slot_start} is not after frontier timestamp {frontier}")]
    StaleSlot {
        slot_start: TimestampSeconds,
        frontier: TimestampSeconds,
    },

    #[error("production step did not finish within {0:?}")]
    Timeout(Duration),

    #[error("production step was cancelled")]
    Cancelled,
}
