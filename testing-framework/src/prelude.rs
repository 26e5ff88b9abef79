// File: testing-framework/src/prelude.rs
//
// Everything a harness test usually needs, in one import.

pub use std::sync::Arc;
pub use std::time::Duration;

pub use log::LevelFilter;
pub use nom_common::{
    block::{AccountBlock, AccountHeader, BlockType, HashHeight, Momentum},
    crypto::{Address, Hash, KeyPair},
    patch::{Patch, NO_VM_CHANGES},
    token::{TokenStandard, QSR_TOKEN_STANDARD, ZNN_TOKEN_STANDARD},
};

pub use crate::node::{
    embedded::{Vault, VaultMethod, VAULT_ADDRESS},
    genesis::{
        Genesis, GENESIS_QSR_BALANCE, GENESIS_TIMESTAMP, GENESIS_ZNN_BALANCE, PILLAR_KEYS,
        USER_KEYS,
    },
    Chain, Consensus, MOMENTUM_SLOT_DURATION, PILLAR_LOG_TARGET,
};
pub use crate::orchestrator::{try_init_test_logger, Clock, LogCapture, LogConfig};
pub use crate::tier1_component::{
    CallError, ContractCallHandle, HarnessConfig, HarnessState, SlotOutcome, TestHarness,
    TestHarnessBuilder, SKIP_VM_CHANGES,
};
pub use crate::utilities::{FailureCollector, TestReporter};
