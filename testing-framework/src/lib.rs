//! # NoM Testing Framework
//!
//! Deterministic, in-process test harness for a Network-of-Momentum ledger:
//! per-account chains plus a global momentum sequence sealed by pillars.
//!
//! ## Architecture Overview
//!
//! - **node**: compact in-memory ledger, producer selection, supervisor
//!   and pillars, consumed through small traits
//! - **orchestrator**: ledger-derived clock, scoped global settings,
//!   capture of producer diagnostics
//! - **tier1_component**: the `TestHarness` and its builder
//! - **utilities**: failure reporting and assertion helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nom_testing_framework::prelude::*;
//!
//! #[tokio::test]
//! async fn test_simple_transfer() {
//!     let harness = TestHarnessBuilder::new().build().unwrap();
//!     let alice = USER_KEYS[0].address();
//!     let bob = USER_KEYS[1].address();
//!
//!     let send = harness
//!         .submit_send(
//!             AccountBlock { address: alice, to_address: bob, amount: 10, ..Default::default() },
//!             None,
//!             SKIP_VM_CHANGES,
//!         )
//!         .unwrap();
//!     harness.advance_one().await;
//!     harness.submit_receive(&send.header(), AccountBlock::default(), None, SKIP_VM_CHANGES);
//!     harness.expect_balance(bob, ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE + 10);
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: time comes from the ledger, keys from fixed seeds
//! 2. **Synchronous driving**: every production step is joined before the
//!    driver returns
//! 3. **Real validation**: blocks and momentums go through the same checks
//!    a node applies

#![warn(clippy::all)]

/// In-process node components
pub mod node;

/// Core orchestration - clock, scoped settings, diagnostics
pub mod orchestrator;

// Tier 1: Component-level testing (in-process, no networking)
pub mod tier1_component;

/// Shared utilities
pub mod utilities;

// Convenient re-exports for common usage
pub mod prelude;

// Re-export commonly used types at crate root
pub use orchestrator::{Clock, FrontierClock};
pub use tier1_component::{TestHarness, TestHarnessBuilder};

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework version descriptor
pub const FRAMEWORK_VERSION: &str = "NoM Testing Framework V1.0";
