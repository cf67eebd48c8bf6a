//! Pipeline configuration
//!
//! Built once at process start and handed to the dispatcher by value.
//! Every field has a default, so a partial TOML file is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default broker endpoint
pub const DEFAULT_BROKER_URL: &str = "redis://localhost:6379";

/// Default soft limit (25 minutes)
pub const DEFAULT_SOFT_TIME_LIMIT_MS: u64 = 25 * 60 * 1000;

/// Default hard limit (30 minutes)
pub const DEFAULT_HARD_TIME_LIMIT_MS: u64 = 30 * 60 * 1000;

/// Default retries after the first attempt
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Default units a worker handles before it is replaced
pub const DEFAULT_MAX_UNITS_PER_WORKER: u64 = 1000;

/// Default number of completed outcomes kept for redelivery checks
pub const DEFAULT_LEDGER_CAPACITY: usize = 10_000;

/// Named execution lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    /// Latency-sensitive stages a user is waiting on
    Interactive,
    /// Social-listening ingestion
    Monitor,
    /// Artifact packaging
    Exports,
}

impl QueueClass {
    /// All queue classes
    pub const ALL: [QueueClass; 3] = [QueueClass::Interactive, QueueClass::Monitor, QueueClass::Exports];

    /// Queue name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueClass::Interactive => "interactive",
            QueueClass::Monitor => "monitor",
            QueueClass::Exports => "exports",
        }
    }
}

impl std::fmt::Display for QueueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution policy of one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Concurrent worker slots
    pub slots: usize,
    /// Queue depth
    pub capacity: usize,
    /// Wind-down signal after this long
    pub soft_time_limit_ms: u64,
    /// Forced termination after this long
    pub hard_time_limit_ms: u64,
    /// Retries after the first attempt
    pub retry_budget: u32,
    /// Units a worker handles before it is replaced
    pub max_units_per_worker: u64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            slots: 2,
            capacity: 256,
            soft_time_limit_ms: DEFAULT_SOFT_TIME_LIMIT_MS,
            hard_time_limit_ms: DEFAULT_HARD_TIME_LIMIT_MS,
            retry_budget: DEFAULT_RETRY_BUDGET,
            max_units_per_worker: DEFAULT_MAX_UNITS_PER_WORKER,
        }
    }
}

impl QueuePolicy {
    /// Set slot count
    #[inline]
    #[must_use]
    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    /// Set queue depth
    #[inline]
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set soft and hard limits
    #[inline]
    #[must_use]
    pub fn with_time_limits(mut self, soft: Duration, hard: Duration) -> Self {
        self.soft_time_limit_ms = u64::try_from(soft.as_millis()).unwrap_or(u64::MAX);
        self.hard_time_limit_ms = u64::try_from(hard.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set retry budget
    #[inline]
    #[must_use]
    pub fn with_retry_budget(mut self, retries: u32) -> Self {
        self.retry_budget = retries;
        self
    }

    /// Set worker recycle threshold
    #[inline]
    #[must_use]
    pub fn with_max_units_per_worker(mut self, units: u64) -> Self {
        self.max_units_per_worker = units;
        self
    }

    /// Soft limit as a duration
    #[inline]
    #[must_use]
    pub fn soft_limit(&self) -> Duration {
        Duration::from_millis(self.soft_time_limit_ms)
    }

    /// Hard limit as a duration
    #[inline]
    #[must_use]
    pub fn hard_limit(&self) -> Duration {
        Duration::from_millis(self.hard_time_limit_ms)
    }

    fn validate(&self, class: QueueClass) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(format!("queue {class}: {msg}")))
        };
        if self.slots == 0 {
            return invalid("slots must be at least 1");
        }
        if self.capacity == 0 {
            return invalid("capacity must be at least 1");
        }
        if self.max_units_per_worker == 0 {
            return invalid("max_units_per_worker must be at least 1");
        }
        if self.soft_time_limit_ms >= self.hard_time_limit_ms {
            return invalid("soft_time_limit_ms must be below hard_time_limit_ms");
        }
        Ok(())
    }
}

/// Whole-process configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Broker endpoint for a distributed deployment
    pub broker_url: String,
    /// Default log filter
    pub log_level: String,
    /// Completed outcomes retained for redelivery checks; oldest evicted first
    pub ledger_capacity: usize,
    /// `interactive` queue policy
    pub interactive: QueuePolicy,
    /// `monitor` queue policy
    pub monitor: QueuePolicy,
    /// `exports` queue policy
    pub exports: QueuePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            log_level: "info".to_string(),
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            interactive: QueuePolicy::default().with_slots(4),
            monitor: QueuePolicy::default(),
            exports: QueuePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Create default config
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for a queue
    #[inline]
    #[must_use]
    pub fn policy(&self, class: QueueClass) -> &QueuePolicy {
        match class {
            QueueClass::Interactive => &self.interactive,
            QueueClass::Monitor => &self.monitor,
            QueueClass::Exports => &self.exports,
        }
    }

    /// Replace a queue's policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, class: QueueClass, policy: QueuePolicy) -> Self {
        match class {
            QueueClass::Interactive => self.interactive = policy,
            QueueClass::Monitor => self.monitor = policy,
            QueueClass::Exports => self.exports = policy,
        }
        self
    }

    /// Set the completion ledger capacity
    #[inline]
    #[must_use]
    pub fn with_ledger_capacity(mut self, capacity: usize) -> Self {
        self.ledger_capacity = capacity;
        self
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field or queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger_capacity == 0 {
            return Err(ConfigError::Invalid("ledger_capacity must be > 0".to_string()));
        }
        for class in QueueClass::ALL {
            self.policy(class).validate(class)?;
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `Parse` for malformed TOML, `Invalid` for inconsistent values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `Encode` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_upstream_worker_settings() {
        let config = PipelineConfig::default();
        assert_eq!(config.broker_url, "redis://localhost:6379");
        for class in QueueClass::ALL {
            let policy = config.policy(class);
            assert_eq!(policy.soft_limit(), Duration::from_secs(25 * 60));
            assert_eq!(policy.hard_limit(), Duration::from_secs(30 * 60));
            assert_eq!(policy.max_units_per_worker, 1000);
        }
        assert_eq!(config.ledger_capacity, DEFAULT_LEDGER_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            log_level = "debug"

            [exports]
            slots = 1
            retry_budget = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.exports.slots, 1);
        assert_eq!(config.exports.retry_budget, 0);
        assert_eq!(config.exports.capacity, 256);
        assert_eq!(config.interactive, PipelineConfig::default().interactive);
    }

    #[test]
    fn soft_limit_must_precede_hard_limit() {
        let err = PipelineConfig::from_toml_str(
            "[monitor]\nsoft_time_limit_ms = 500\nhard_time_limit_ms = 500\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("monitor")));
    }

    #[test]
    fn zero_slots_rejected() {
        let config = PipelineConfig::default()
            .with_policy(QueueClass::Interactive, QueuePolicy::default().with_slots(0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_ledger_capacity_rejected() {
        let err = PipelineConfig::from_toml_str("ledger_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("ledger_capacity")));

        let config = PipelineConfig::from_toml_str("ledger_capacity = 64").unwrap();
        assert_eq!(config.ledger_capacity, 64);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml_str("interactive = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_output_parses_back() {
        let config = PipelineConfig::default();
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
