//! Configuration types and structures.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default = "default_statuses")]
    pub statuses: Vec<StatusDefinition>,

    #[serde(default = "default_priorities")]
    pub priorities: Vec<PriorityDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            statuses: default_statuses(),
            priorities: default_priorities(),
        }
    }
}

/// Whether completed records can be classified as overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverduePolicy {
    /// Completed records are never overdue (default).
    #[default]
    ExcludeCompleted,
    /// Any record dated before today is overdue.
    IncludeCompleted,
}

/// Query engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lifetime of a cached index lookup, in milliseconds (default: 30000).
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Lifetime of cached distinct property values, in milliseconds (default: 30000).
    #[serde(default = "default_cache_ttl_ms")]
    pub values_cache_ttl_ms: u64,

    /// Number of records hydrated per batch (default: 50).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub overdue_policy: OverduePolicy,

    /// Allow index pruning when it is provably safe (default: true).
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_cache_ttl_ms(),
            values_cache_ttl_ms: default_cache_ttl_ms(),
            batch_size: default_batch_size(),
            overdue_policy: OverduePolicy::default(),
            optimize: default_optimize(),
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn values_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.values_cache_ttl_ms)
    }
}

fn default_cache_ttl_ms() -> u64 {
    30_000 // 30 seconds
}

fn default_batch_size() -> usize {
    50
}

fn default_optimize() -> bool {
    true
}

/// A status value known to the status registry. List order is sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Whether a record in this status counts as done.
    #[serde(default)]
    pub completed: bool,
}

impl StatusDefinition {
    pub fn new(value: &str, completed: bool) -> Self {
        Self {
            value: value.to_string(),
            label: None,
            completed,
        }
    }
}

/// A priority value and its sort weight (higher = more important).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDefinition {
    pub value: String,
    pub weight: i32,
}

impl PriorityDefinition {
    pub fn new(value: &str, weight: i32) -> Self {
        Self {
            value: value.to_string(),
            weight,
        }
    }
}

fn default_statuses() -> Vec<StatusDefinition> {
    vec![
        StatusDefinition::new("open", false),
        StatusDefinition::new("in-progress", false),
        StatusDefinition::new("done", true),
    ]
}

fn default_priorities() -> Vec<PriorityDefinition> {
    vec![
        PriorityDefinition::new("none", 0),
        PriorityDefinition::new("low", 1),
        PriorityDefinition::new("normal", 2),
        PriorityDefinition::new("high", 3),
    ]
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.engine.batch_size == 0 {
            return Err(anyhow!("engine.batch_size must be at least 1"));
        }

        if self.statuses.is_empty() {
            return Err(anyhow!("At least one status must be defined"));
        }

        let mut seen = HashSet::new();
        for status in &self.statuses {
            if status.value.trim().is_empty() {
                return Err(anyhow!("Status values must not be blank"));
            }
            if !seen.insert(status.value.as_str()) {
                return Err(anyhow!("Duplicate status '{}'", status.value));
            }
        }

        let mut seen = HashSet::new();
        for priority in &self.priorities {
            if !seen.insert(priority.value.as_str()) {
                return Err(anyhow!("Duplicate priority '{}'", priority.value));
            }
        }

        Ok(())
    }
}
