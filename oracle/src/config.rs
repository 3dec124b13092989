//! Configuration types controlling how oracle runs are driven and judged.

use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable selecting the divergence policy
pub const ENV_DIVERGENCE_POLICY: &str = "ORACLE_DIVERGENCE_POLICY";
/// Environment variable selecting the key strategy
pub const ENV_KEY_STRATEGY: &str = "ORACLE_KEY_STRATEGY";
/// Environment variable enabling the follow-up presence check
pub const ENV_VERIFY_FINAL_STATE: &str = "ORACLE_VERIFY_FINAL_STATE";
/// Environment variable overriding the parallel worker count
pub const ENV_WORKERS: &str = "ORACLE_WORKERS";

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Worker count must be > 0
    #[error("Invalid worker count: {0} (must be > 0)")]
    InvalidWorkers(usize),

    /// An environment override could not be parsed
    #[error("Invalid value {value:?} for {variable}: expected {expected}")]
    InvalidEnv {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// How the engine reacts when the system reports a failure the model did
/// not predict for an operation it believed would succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DivergencePolicy {
    /// Every unpredicted outcome is a divergence.
    Strict,
    /// An unexpected `NotFound`/`Rejected` on Update resynchronises the model
    /// to absent, and a rejected Create on an absent key discards the run.
    #[default]
    Tolerant,
}

impl DivergencePolicy {
    pub fn is_strict(self) -> bool {
        matches!(self, DivergencePolicy::Strict)
    }
}

impl FromStr for DivergencePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(DivergencePolicy::Strict),
            "tolerant" => Ok(DivergencePolicy::Tolerant),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DivergencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergencePolicy::Strict => write!(f, "strict"),
            DivergencePolicy::Tolerant => write!(f, "tolerant"),
        }
    }
}

/// How the run key is derived from the seed key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum KeyStrategy {
    /// Use the seed key as-is for single runs. Batches partition regardless.
    #[default]
    Verbatim,
    /// Suffix the seed key with the run id so concurrent runs never collide.
    Partitioned,
}

impl FromStr for KeyStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbatim" => Ok(KeyStrategy::Verbatim),
            "partitioned" => Ok(KeyStrategy::Partitioned),
            _ => Err(()),
        }
    }
}

/// Configuration for parallel batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Number of worker threads
    pub workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
        }
    }
}

/// Configuration for oracle runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Reaction to unexpected failures from the system under test
    pub divergence_policy: DivergencePolicy,
    /// Derivation of the per-run key
    pub key_strategy: KeyStrategy,
    /// Issue a follow-up read after a clean run and compare presence
    pub verify_final_state: bool,
    /// Keep a per-step trace of every run
    pub record_trace: bool,
    /// Parallel batch settings
    pub parallel: ParallelConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            divergence_policy: DivergencePolicy::default(),
            key_strategy: KeyStrategy::default(),
            verify_final_state: false,
            record_trace: true,
            parallel: ParallelConfig::default(),
        }
    }
}

impl OracleConfig {
    /// Strict configuration: every unpredicted outcome fails the run
    pub fn strict() -> Self {
        Self::default().with_policy(DivergencePolicy::Strict)
    }

    pub fn with_policy(mut self, policy: DivergencePolicy) -> Self {
        self.divergence_policy = policy;
        self
    }

    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    pub fn with_final_state_check(mut self, enabled: bool) -> Self {
        self.verify_final_state = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.record_trace = enabled;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.parallel.workers = workers;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel.workers == 0 {
            return Err(ConfigError::InvalidWorkers(self.parallel.workers));
        }
        Ok(())
    }

    /// Defaults overlaid with the `ORACLE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env(|name| env::var(name).ok())
    }

    /// Overlay overrides looked up through `lookup` onto this configuration
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DIVERGENCE_POLICY) {
            self.divergence_policy = value.parse().map_err(|_| ConfigError::InvalidEnv {
                variable: ENV_DIVERGENCE_POLICY,
                value: value.clone(),
                expected: "strict or tolerant",
            })?;
        }

        if let Some(value) = lookup(ENV_KEY_STRATEGY) {
            self.key_strategy = value.parse().map_err(|_| ConfigError::InvalidEnv {
                variable: ENV_KEY_STRATEGY,
                value: value.clone(),
                expected: "verbatim or partitioned",
            })?;
        }

        if let Some(value) = lookup(ENV_VERIFY_FINAL_STATE) {
            self.verify_final_state = parse_flag(&value).ok_or_else(|| ConfigError::InvalidEnv {
                variable: ENV_VERIFY_FINAL_STATE,
                value: value.clone(),
                expected: "true, false, 1 or 0",
            })?;
        }

        if let Some(value) = lookup(ENV_WORKERS) {
            self.parallel.workers = value
                .trim()
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    variable: ENV_WORKERS,
                    value: value.clone(),
                    expected: "a positive integer",
                })?;
        }

        self.validate()?;
        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = OracleConfig::default();
        assert_eq!(config.divergence_policy, DivergencePolicy::Tolerant);
        assert_eq!(config.key_strategy, KeyStrategy::Verbatim);
        assert!(!config.verify_final_state);
        assert!(config.record_trace);
        assert!(config.parallel.workers > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = OracleConfig::default().with_workers(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidWorkers(0)));
    }

    #[test]
    fn test_env_overrides() {
        let config = OracleConfig::default()
            .merge_env(lookup_from(&[
                (ENV_DIVERGENCE_POLICY, "STRICT"),
                (ENV_KEY_STRATEGY, "partitioned"),
                (ENV_VERIFY_FINAL_STATE, "1"),
                (ENV_WORKERS, "3"),
            ]))
            .unwrap();

        assert!(config.divergence_policy.is_strict());
        assert_eq!(config.key_strategy, KeyStrategy::Partitioned);
        assert!(config.verify_final_state);
        assert_eq!(config.parallel.workers, 3);
    }

    #[test]
    fn test_env_invalid_values() {
        let err = OracleConfig::default()
            .merge_env(lookup_from(&[(ENV_DIVERGENCE_POLICY, "lenient")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                variable: ENV_DIVERGENCE_POLICY,
                ..
            }
        ));

        let err = OracleConfig::default()
            .merge_env(lookup_from(&[(ENV_WORKERS, "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn test_env_absent_keeps_defaults() {
        let config = OracleConfig::default().merge_env(|_| None).unwrap();
        assert_eq!(config, OracleConfig::default());
    }
}
