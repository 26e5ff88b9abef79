// File: testing-framework/src/orchestrator/logging.rs
//
// Scoped log verbosity
//
// Ledger, consensus and supervisor are chatty. The harness lowers the
// global `log` level while it runs and releases that request when it is
// torn down, including during unwinding.

use lazy_static::lazy_static;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use super::overrides::{OverrideId, OverrideRegistry};

/// Log verbosity applied while a harness is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level let through the `log` facade
    pub level: LevelFilter,
}

impl LogConfig {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Apply this configuration until the returned guard is dropped
    pub fn apply(&self) -> LogLevelGuard {
        LogLevelGuard::set(self.level)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Error,
        }
    }
}

lazy_static! {
    static ref LEVEL_OVERRIDES: OverrideRegistry<LevelFilter> =
        OverrideRegistry::new(log::max_level, log::set_max_level, most_verbose);
}

// Live harnesses share one global level, so the chattiest request wins
fn most_verbose(levels: &[LevelFilter]) -> LevelFilter {
    levels.iter().copied().max().unwrap_or(LevelFilter::Off)
}

/// Holds a global log level request until dropped
///
/// While several guards are alive the most verbose level applies. The
/// level seen before the first guard comes back once the last one is gone.
#[must_use = "the level request is released as soon as the guard is dropped"]
pub struct LogLevelGuard {
    id: OverrideId,
    level: LevelFilter,
}

impl LogLevelGuard {
    pub fn set(level: LevelFilter) -> Self {
        Self {
            id: LEVEL_OVERRIDES.register(level),
            level,
        }
    }

    /// Level in effect before any live guard
    pub fn baseline() -> LevelFilter {
        LEVEL_OVERRIDES.baseline()
    }

    /// Level this guard asked for
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl Drop for LogLevelGuard {
    fn drop(&mut self) {
        LEVEL_OVERRIDES.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_silences_everything_but_errors() {
        assert_eq!(LogConfig::default().level, LevelFilter::Error);
    }

    #[test]
    fn test_most_verbose_request_wins() {
        let levels = [LevelFilter::Error, LevelFilter::Debug, LevelFilter::Warn];
        assert_eq!(most_verbose(&levels), LevelFilter::Debug);
        assert_eq!(most_verbose(&[LevelFilter::Off]), LevelFilter::Off);
    }

    #[test]
    fn test_config_from_yaml() {
        let config: LogConfig = serde_yaml::from_str("level: DEBUG").unwrap();
        assert_eq!(config.level, LevelFilter::Debug);

        let config: LogConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, LogConfig::default());
    }
}
