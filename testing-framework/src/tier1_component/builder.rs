//! TestHarnessBuilder - Fluent API for configuring TestHarness instances

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use super::harness::{Components, LedgerBroadcaster, TestHarness};
use crate::node::{
    genesis::{key_for, Genesis},
    Broadcaster, ElectionConsensus, MemoryChain, Pillar, Producer, Supervisor,
};
use crate::orchestrator::{Clock, DiagnosticCapture, EpochDurationGuard, FrontierClock, LogConfig};
use crate::utilities::{FailureCollector, TestReporter};

/// Serializable harness settings
///
/// # Example
///
/// ```yaml
/// log:
///   level: WARN
/// epoch_duration_secs: 3600
/// production_timeout_ms: 5000
/// owned_pillars: [0, 2]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Log verbosity while the harness is alive
    pub log: LogConfig,

    /// Process-wide epoch duration override, restored on teardown
    pub epoch_duration_secs: Option<u64>,

    /// Upper bound for one production step; unbounded when unset
    pub production_timeout_ms: Option<u64>,

    /// Indexes into the genesis pillar list the harness produces for;
    /// every genesis pillar when unset
    pub owned_pillars: Option<Vec<usize>>,
}

impl HarnessConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("invalid harness config")
    }

    pub fn epoch_duration(&self) -> Option<Duration> {
        self.epoch_duration_secs.map(Duration::from_secs)
    }

    pub fn production_timeout(&self) -> Option<Duration> {
        self.production_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for TestHarness instances with fluent API
///
/// # Example
///
/// ```rust,ignore
/// use nom_testing_framework::tier1_component::TestHarnessBuilder;
///
/// let harness = TestHarnessBuilder::new()
///     .with_log_level(LevelFilter::Warn)
///     .with_epoch_duration(Duration::from_secs(3600))
///     .with_owned_pillars(vec![0])
///     .build()?;
/// ```
pub struct TestHarnessBuilder {
    config: HarnessConfig,
    genesis: Genesis,
    reporter: Option<Arc<dyn TestReporter>>,
}

impl TestHarnessBuilder {
    /// Create new builder with defaults
    ///
    /// Default configuration:
    /// - Embedded genesis, every pillar owned
    /// - Log level `Error`
    /// - No epoch override, no production timeout
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
            genesis: Genesis::embedded(),
            reporter: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.config.log = LogConfig::new(level);
        self
    }

    /// Override the process-wide epoch duration for the harness lifetime
    pub fn with_epoch_duration(mut self, duration: Duration) -> Self {
        self.config.epoch_duration_secs = Some(duration.as_secs());
        self
    }

    pub fn with_production_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.config.production_timeout_ms = Some(millis);
        self
    }

    /// Only produce for the genesis pillars at these indexes
    ///
    /// Slots of the other pillars are skipped by the production driver.
    pub fn with_owned_pillars(mut self, indexes: Vec<usize>) -> Self {
        self.config.owned_pillars = Some(indexes);
        self
    }

    pub fn with_genesis(mut self, genesis: Genesis) -> Self {
        self.genesis = genesis;
        self
    }

    /// Failure sink; a fresh `FailureCollector` when unset
    pub fn with_reporter(mut self, reporter: Arc<dyn TestReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Build every component without initializing anything
    ///
    /// # Errors
    ///
    /// Returns an error if an owned pillar index is out of range or a
    /// genesis pillar has no registered key.
    pub fn construct(self) -> Result<TestHarness> {
        let pillar_keys = self
            .owned_indexes()?
            .into_iter()
            .map(|index| {
                let address = self.genesis.pillars[index];
                key_for(&address)
                    .with_context(|| format!("no key registered for genesis pillar {}", address))
            })
            .collect::<Result<Vec<_>>>()?;

        // Without an override, use what the process had before any live
        // harness changed it
        let epoch = self
            .config
            .epoch_duration()
            .unwrap_or_else(EpochDurationGuard::baseline);
        let log_guard = self.config.log.apply();
        let epoch_guard = self.config.epoch_duration().map(EpochDurationGuard::set);

        let chain = Arc::new(MemoryChain::new(self.genesis.clone()));
        let consensus = Arc::new(ElectionConsensus::new(&self.genesis, epoch));
        let clock = Arc::new(FrontierClock::new(chain.clone(), self.genesis.timestamp));
        let capture = Arc::new(DiagnosticCapture::new(clock.clone() as Arc<dyn Clock>));
        let broadcaster: Arc<dyn Broadcaster> = Arc::new(LedgerBroadcaster::new(chain.clone()));

        let pillars = pillar_keys
            .into_iter()
            .map(|key| {
                let pillar = Pillar::new(chain.clone(), consensus.clone(), broadcaster.clone());
                pillar.set_coinbase(key.clone());
                pillar.add_observer(capture.clone());
                pillar
            })
            .collect();

        let components = Components {
            supervisor: Supervisor::new(chain.clone()),
            chain,
            consensus,
            pillars,
        };

        let reporter: Arc<dyn TestReporter> = match self.reporter {
            Some(reporter) => reporter,
            None => Arc::new(FailureCollector::new()),
        };

        Ok(TestHarness::new(
            self.config,
            self.genesis,
            reporter,
            clock,
            capture,
            components,
            log_guard,
            epoch_guard,
        ))
    }

    /// Build, initialize and start the harness
    ///
    /// # Errors
    ///
    /// Returns an error if construction fails. Component init or start
    /// failures are fatal.
    pub fn build(self) -> Result<TestHarness> {
        let mut harness = self.construct()?;
        harness.init();
        harness.start();
        Ok(harness)
    }

    fn owned_indexes(&self) -> Result<Vec<usize>> {
        let count = self.genesis.pillars.len();
        match &self.config.owned_pillars {
            None => Ok((0..count).collect()),
            Some(indexes) => {
                for index in indexes {
                    if *index >= count {
                        bail!(
                            "owned pillar index {} out of range (genesis has {} pillars)",
                            index,
                            count
                        );
                    }
                }
                Ok(indexes.clone())
            }
        }
    }
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
