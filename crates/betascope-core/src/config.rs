use std::time::Duration;

use crate::CoreError;

/// Engine limits. Defaults match the behaviour users expect from a single
/// request; every value can be overridden from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Peers kept after ranking.
    pub max_peers: usize,
    /// Keyword search runs only while fewer candidates than this exist.
    pub search_threshold: usize,
    pub search_limit: usize,
    /// Concurrent provider calls per fan-out stage.
    pub max_concurrency: usize,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_peers: 10,
            search_threshold: 10,
            search_limit: 20,
            max_concurrency: 8,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `BETASCOPE_MAX_PEERS`, `BETASCOPE_SEARCH_LIMIT`,
    /// `BETASCOPE_MAX_CONCURRENCY` and `BETASCOPE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();
        let read = |key: &str, fallback: usize| -> Result<usize, CoreError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| CoreError::Config(format!("{key} must be a positive integer, got '{raw}'"))),
                None => Ok(fallback),
            }
        };

        let timeout_ms = read(
            "BETASCOPE_TIMEOUT_MS",
            defaults.request_timeout.as_millis() as usize,
        )?;
        let config = Self {
            max_peers: read("BETASCOPE_MAX_PEERS", defaults.max_peers)?,
            search_threshold: defaults.search_threshold,
            search_limit: read("BETASCOPE_SEARCH_LIMIT", defaults.search_limit)?,
            max_concurrency: read("BETASCOPE_MAX_CONCURRENCY", defaults.max_concurrency)?,
            request_timeout: Duration::from_millis(timeout_ms as u64),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let checks = [
            ("max_peers", self.max_peers),
            ("search_threshold", self.search_threshold),
            ("search_limit", self.search_limit),
            ("max_concurrency", self.max_concurrency),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, value)| *value == 0) {
            return Err(CoreError::Config(format!("{name} must be greater than zero")));
        }
        if self.request_timeout.is_zero() {
            return Err(CoreError::Config(String::from(
                "request_timeout must be greater than zero",
            )));
        }
        Ok(())
    }
}
