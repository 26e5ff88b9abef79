//! Tier 1: Component-level testing
//!
//! In-process ledger, consensus and pillars without networking.
//! Fast, deterministic, driven one momentum at a time.
//!
//! ## Key Features
//!
//! - Time derived from the ledger frontier, never from the wall clock
//! - Real producer selection and block validation
//! - Deferred verification of embedded contract calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use nom_testing_framework::prelude::*;
//!
//! #[tokio::test]
//! async fn test_deposit() {
//!     let harness = TestHarnessBuilder::new().build().unwrap();
//!     let alice = USER_KEYS[0].address();
//!
//!     let call = harness.call_contract(AccountBlock {
//!         address: alice,
//!         to_address: VAULT_ADDRESS,
//!         amount: 10,
//!         data: VaultMethod::Deposit.to_data(),
//!         ..Default::default()
//!     });
//!     harness.advance_one().await;
//!     call.expect(harness.reporter(), None);
//! }
//! ```

mod builder;
mod contract_caller;
mod driver;
mod harness;
mod injector;

pub use builder::{HarnessConfig, TestHarnessBuilder};
pub use contract_caller::{CallError, ContractCallHandle};
pub use driver::SlotOutcome;
pub use harness::{AccountContext, HarnessState, LedgerBroadcaster, TestHarness};
pub use injector::SKIP_VM_CHANGES;
