//! Status and priority registries.
//!
//! The engine only asks three questions of these: is a status "done", where
//! does a status sit in the workflow sequence, and how heavy is a priority.

use crate::config::{Config, PriorityDefinition, StatusDefinition};
use std::collections::HashMap;

/// Knowledge about status values.
pub trait StatusRegistry: Send + Sync {
    fn is_completed_status(&self, status: &str) -> bool;

    /// Sequence number of a status. Unknown statuses order after known ones.
    fn status_order(&self, status: &str) -> usize;
}

/// Knowledge about priority values.
pub trait PriorityRegistry: Send + Sync {
    /// Weight of a priority (higher = more important). Unknown values weigh 0.
    fn priority_weight(&self, priority: &str) -> i32;
}

/// Status registry built from configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredStatuses {
    order: HashMap<String, usize>,
    completed: Vec<String>,
}

impl ConfiguredStatuses {
    pub fn new(definitions: &[StatusDefinition]) -> Self {
        Self {
            order: definitions
                .iter()
                .enumerate()
                .map(|(i, def)| (def.value.clone(), i))
                .collect(),
            completed: definitions
                .iter()
                .filter(|def| def.completed)
                .map(|def| def.value.clone())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.statuses)
    }

    /// Statuses that count as done, in sequence order.
    pub fn completed_statuses(&self) -> &[String] {
        &self.completed
    }
}

impl StatusRegistry for ConfiguredStatuses {
    fn is_completed_status(&self, status: &str) -> bool {
        self.completed.iter().any(|s| s == status)
    }

    fn status_order(&self, status: &str) -> usize {
        self.order.get(status).copied().unwrap_or(self.order.len())
    }
}

/// Priority registry built from configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredPriorities {
    weights: HashMap<String, i32>,
}

impl ConfiguredPriorities {
    pub fn new(definitions: &[PriorityDefinition]) -> Self {
        Self {
            weights: definitions
                .iter()
                .map(|def| (def.value.clone(), def.weight))
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.priorities)
    }
}

impl PriorityRegistry for ConfiguredPriorities {
    fn priority_weight(&self, priority: &str) -> i32 {
        self.weights.get(priority).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_and_completion() {
        let statuses = ConfiguredStatuses::from_config(&Config::default());
        assert_eq!(statuses.status_order("open"), 0);
        assert_eq!(statuses.status_order("done"), 2);
        assert_eq!(statuses.status_order("mystery"), 3);
        assert!(statuses.is_completed_status("done"));
        assert!(!statuses.is_completed_status("open"));
        assert_eq!(statuses.completed_statuses(), ["done".to_string()]);
    }

    #[test]
    fn test_priority_weights() {
        let priorities = ConfiguredPriorities::from_config(&Config::default());
        assert!(priorities.priority_weight("high") > priorities.priority_weight("low"));
        assert_eq!(priorities.priority_weight("unknown"), 0);
    }
}
