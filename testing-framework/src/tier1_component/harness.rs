//! TestHarness - In-process ledger, consensus and pillars driven by the test
//!
//! The harness owns every node component and exposes them through a small,
//! synchronous-looking API: submit blocks, produce momentums, assert state.

use std::fmt::Display;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, LevelFilter};
use nom_common::{
    block::{AccountBlock, AccountBlockTransaction, Momentum},
    crypto::Address,
    token::TokenStandard,
};

use super::builder::HarnessConfig;
use crate::node::{
    genesis::Genesis, Broadcaster, Chain, ChainError, Consensus, ElectionConsensus, MemoryChain,
    Pillar, Producer, Supervisor,
};
use crate::orchestrator::{
    DiagnosticCapture, EpochDurationGuard, FrontierClock, LogCapture, LogLevelGuard,
};
use crate::utilities::{expect_amount, format_failures, TestReporter};

/// Lifecycle state of a [`TestHarness`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    /// Components built, nothing initialized
    Uninitialized,
    /// Every component initialized, none started
    Initialized,
    /// Every component running
    Running,
    /// Torn down; the harness can not be restarted
    Stopped,
}

/// Broadcaster inserting straight into the harness ledger
pub struct LedgerBroadcaster {
    chain: Arc<dyn Chain>,
}

impl LedgerBroadcaster {
    pub fn new(chain: Arc<dyn Chain>) -> Self {
        Self { chain }
    }
}

impl Broadcaster for LedgerBroadcaster {
    fn create_account_block(&self, transaction: AccountBlockTransaction) -> Result<(), ChainError> {
        debug!("broadcast account-block {}", transaction.block.header());
        self.chain.insert_account_block(transaction)
    }

    fn create_momentum(&self, momentum: Momentum) -> Result<(), ChainError> {
        debug!("broadcast momentum {}", momentum.identifier());
        self.chain.insert_momentum(momentum)
    }
}

pub(crate) struct Components {
    pub(crate) chain: Arc<MemoryChain>,
    pub(crate) consensus: Arc<ElectionConsensus>,
    pub(crate) supervisor: Supervisor,
    pub(crate) pillars: Vec<Pillar>,
}

/// Deterministic in-process test harness
///
/// TestHarness provides:
/// - A ledger seeded from a deterministic genesis
/// - Real producer selection and block validation
/// - A clock that only moves when a momentum is produced
/// - Deferred verification of embedded contract calls
///
/// # Example
///
/// ```rust,ignore
/// use nom_testing_framework::prelude::*;
///
/// let harness = TestHarnessBuilder::new().build()?;
/// let call = harness.call_contract(AccountBlock {
///     address: USER_KEYS[0].address(),
///     to_address: VAULT_ADDRESS,
///     amount: 10,
///     data: VaultMethod::Deposit.to_data(),
///     ..Default::default()
/// });
/// harness.advance_one().await;
/// call.expect(harness.reporter(), None);
/// ```
pub struct TestHarness {
    pub(crate) config: HarnessConfig,
    genesis: Genesis,
    state: HarnessState,
    reporter: Arc<dyn TestReporter>,
    clock: Arc<FrontierClock>,
    pub(crate) capture: Arc<DiagnosticCapture>,
    components: Option<Components>,

    // Restored on teardown
    log_guard: Option<LogLevelGuard>,
    epoch_guard: Option<EpochDurationGuard>,
}

impl TestHarness {
    /// Assemble a harness from built parts
    ///
    /// This is an internal constructor. Use `TestHarnessBuilder` instead.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: HarnessConfig,
        genesis: Genesis,
        reporter: Arc<dyn TestReporter>,
        clock: Arc<FrontierClock>,
        capture: Arc<DiagnosticCapture>,
        components: Components,
        log_guard: LogLevelGuard,
        epoch_guard: Option<EpochDurationGuard>,
    ) -> Self {
        Self {
            config,
            genesis,
            state: HarnessState::Uninitialized,
            reporter,
            clock,
            capture,
            components: Some(components),
            log_guard: Some(log_guard),
            epoch_guard,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialize chain, consensus and pillars, in that order
    ///
    /// # Panics
    ///
    /// Panics if the harness is not `Uninitialized` or a component fails.
    pub fn init(&mut self) {
        self.expect_state("init", HarnessState::Uninitialized);
        let result = self.init_components();
        self.fatal_on_error("harness init failed", result);
        self.state = HarnessState::Initialized;
    }

    /// Start chain, consensus and pillars, in that order
    ///
    /// # Panics
    ///
    /// Panics if the harness is not `Initialized` or a component fails.
    pub fn start(&mut self) {
        self.expect_state("start", HarnessState::Initialized);
        let result = self.start_components();
        self.fatal_on_error("harness start failed", result);
        self.state = HarnessState::Running;
        info!(
            "harness running with {} owned pillar(s)",
            self.components().pillars.len()
        );
    }

    /// Stop pillars, consensus and chain, in that order, and restore the
    /// process-wide log level and epoch duration
    ///
    /// # Panics
    ///
    /// Panics if the harness was already stopped or a component fails.
    pub fn stop(&mut self) {
        if self.state == HarnessState::Stopped {
            self.reporter.fatal("harness is already stopped".to_string());
        }
        let result = self.shutdown();
        self.fatal_on_error("harness stop failed", result);
    }

    /// Current lifecycle state
    pub fn state(&self) -> HarnessState {
        self.state
    }

    fn init_components(&self) -> Result<()> {
        let components = self.components();
        components.chain.init().context("init chain")?;
        components.consensus.init().context("init consensus")?;
        for pillar in &components.pillars {
            pillar.init().context("init pillar")?;
        }
        Ok(())
    }

    fn start_components(&self) -> Result<()> {
        let components = self.components();
        components.chain.start().context("start chain")?;
        components.consensus.start().context("start consensus")?;
        for pillar in &components.pillars {
            pillar.start().context("start pillar")?;
        }
        Ok(())
    }

    // Idempotent; guards and handles are released even when a stop fails
    fn shutdown(&mut self) -> Result<()> {
        let previous = std::mem::replace(&mut self.state, HarnessState::Stopped);
        let mut result = Ok(());

        if let Some(components) = self.components.take() {
            if previous != HarnessState::Uninitialized {
                result = Self::stop_components(&components);
            }
        }
        self.capture.clear();
        self.epoch_guard.take();
        self.log_guard.take();

        if previous != HarnessState::Stopped {
            debug!("harness stopped (was {:?})", previous);
        }
        result
    }

    fn stop_components(components: &Components) -> Result<()> {
        for pillar in components.pillars.iter().rev() {
            pillar.stop().context("stop pillar")?;
        }
        components.consensus.stop().context("stop consensus")?;
        components.chain.stop().context("stop chain")?;
        Ok(())
    }

    fn expect_state(&self, action: &str, expected: HarnessState) {
        if self.state != expected {
            self.reporter.fatal(format!(
                "cannot {} while the harness is {:?}",
                action, self.state
            ));
        }
    }

    fn components(&self) -> &Components {
        match &self.components {
            Some(components) => components,
            None => self.reporter.fatal("harness components were released".to_string()),
        }
    }

    /// Components of a running harness; fatal otherwise
    pub(crate) fn running(&self, action: &str) -> &Components {
        match (self.state, &self.components) {
            (HarnessState::Running, Some(components)) => components,
            (state, _) => self
                .reporter
                .fatal(format!("cannot {} while the harness is {:?}", action, state)),
        }
    }

    // Read access is fine before start
    fn readable(&self, action: &str) -> &Components {
        match (self.state, &self.components) {
            (HarnessState::Initialized | HarnessState::Running, Some(components)) => components,
            (state, _) => self
                .reporter
                .fatal(format!("cannot {} while the harness is {:?}", action, state)),
        }
    }

    pub(crate) fn fatal_on_error<T, E: Display>(&self, what: &str, result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => self.reporter.fatal(format!("{}: {:#}", what, e)),
        }
    }

    // ========================================================================
    // State access
    // ========================================================================

    /// Configuration the harness was built with
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    /// Failure sink used by every assertion of this harness
    pub fn reporter(&self) -> &dyn TestReporter {
        self.reporter.as_ref()
    }

    /// Outcomes of embedded executions seen so far
    pub fn diagnostics(&self) -> Arc<DiagnosticCapture> {
        self.capture.clone()
    }

    /// Collect `Info` and more severe messages logged under `target`
    ///
    /// Collection stops when the returned capture is dropped. Fatal if the
    /// capturing logger can not be installed.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let logs = harness.save_logs(PILLAR_LOG_TARGET);
    /// harness.advance_one().await;
    /// logs.expect(harness.reporter(), "generated embedded-block ...");
    /// ```
    pub fn save_logs(&self, target: &str) -> LogCapture {
        match LogCapture::start(target, LevelFilter::Info) {
            Ok(capture) => capture,
            Err(err) => self.reporter.fatal(format!("cannot capture logs of {}: {}", target, err)),
        }
    }

    /// Ledger handle
    pub fn chain(&self) -> Arc<MemoryChain> {
        self.readable("access the chain").chain.clone()
    }

    /// Producer selection handle
    pub fn consensus(&self) -> Arc<ElectionConsensus> {
        self.readable("access consensus").consensus.clone()
    }

    /// Coinbase addresses of the pillars owned by this harness
    pub fn owned_producers(&self) -> Vec<Address> {
        self.readable("list pillars")
            .pillars
            .iter()
            .filter_map(|pillar| pillar.coinbase())
            .collect()
    }

    /// Logical time: the frontier momentum timestamp
    ///
    /// # Panics
    ///
    /// Panics once the harness was stopped.
    pub fn now(&self) -> DateTime<Utc> {
        let result = self.clock.try_now();
        self.fatal_on_error("read clock", result)
    }

    /// Latest momentum
    pub fn frontier_momentum(&self) -> Momentum {
        let result = self.readable("read the frontier").chain.frontier_momentum();
        self.fatal_on_error("read frontier momentum", result)
    }

    /// Height of the latest momentum
    pub fn frontier_height(&self) -> u64 {
        self.frontier_momentum().height
    }

    /// Read-only view of one account
    pub fn account_context(&self, address: Address) -> AccountContext<'_> {
        AccountContext {
            harness: self,
            chain: self.chain(),
            address,
        }
    }

    /// Assert the balance of an account; an account that never held the
    /// token has a balance of zero
    pub fn expect_balance(&self, address: Address, token_standard: TokenStandard, expected: u64) {
        let actual = self.account_context(address).balance(&token_standard);
        expect_amount(
            self.reporter(),
            &format!("balance of {} in {}", address, token_standard),
            actual,
            expected,
        );
    }

    /// Assertion failures recorded so far
    pub fn failures(&self) -> Vec<String> {
        self.reporter.failures()
    }

    /// Assertion failures recorded so far; the harness no longer reports
    /// them on drop
    pub fn take_failures(&self) -> Vec<String> {
        self.reporter.take_failures()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if self.state != HarnessState::Stopped {
            if let Err(e) = self.shutdown() {
                error!("harness teardown failed: {:#}", e);
            }
        }

        let failures = self.reporter.take_failures();
        if !failures.is_empty() && !std::thread::panicking() {
            panic!(
                "harness dropped with {} unreported failure(s):\n{}",
                failures.len(),
                format_failures(&failures)
            );
        }
    }
}

/// Read-only view of one account of a harness ledger
pub struct AccountContext<'a> {
    harness: &'a TestHarness,
    chain: Arc<MemoryChain>,
    address: Address,
}

impl AccountContext<'_> {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Latest block of the account chain
    pub fn frontier(&self) -> Option<AccountBlock> {
        let result = self.chain.frontier_account_block(&self.address);
        self.harness.fatal_on_error("read account frontier", result)
    }

    /// Height of the account chain; zero for an untouched account
    pub fn height(&self) -> u64 {
        self.frontier().map_or(0, |block| block.height)
    }

    pub fn block_at(&self, height: u64) -> Option<AccountBlock> {
        let result = self.chain.account_block_by_height(&self.address, height);
        self.harness.fatal_on_error("read account-block", result)
    }

    /// Balance, zero when the account never held the token
    pub fn balance(&self, token_standard: &TokenStandard) -> u64 {
        let result = self.chain.balance(&self.address, token_standard);
        self.harness
            .fatal_on_error("read balance", result)
            .unwrap_or(0)
    }

    pub fn storage_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        let result = self.chain.storage_value(&self.address, key);
        self.harness.fatal_on_error("read storage", result)
    }
}
