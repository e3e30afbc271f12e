//! Core types for the task view query engine.

use serde::{Deserialize, Serialize};

/// A task record as seen by the query engine.
///
/// Records are owned by the index provider; the engine only ever reads
/// snapshots of them. `path` is the unique identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,

    /// Date (`YYYY-MM-DD`) or date-time string.
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub scheduled: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,

    /// Recurrence rule (RRULE-like). `None` for one-off tasks.
    #[serde(default)]
    pub recurrence: Option<String>,
    /// Dates (`YYYY-MM-DD`) on which an occurrence of a recurring task was completed.
    #[serde(default)]
    pub complete_instances: Vec<String>,

    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub completed_date: Option<String>,
    /// Estimated effort in minutes.
    #[serde(default)]
    pub time_estimate: Option<i64>,

    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
}

impl TaskRecord {
    /// Create a record with just an identity and a title.
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Whether this record carries a non-blank recurrence rule.
    pub fn is_recurring(&self) -> bool {
        self.recurrence
            .as_deref()
            .is_some_and(|rule| !rule.trim().is_empty())
    }

    /// Non-blank project names.
    pub fn project_names(&self) -> Vec<&str> {
        self.projects
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_recurring_ignores_blank_rule() {
        let mut task = TaskRecord::new("a.md", "A");
        assert!(!task.is_recurring());

        task.recurrence = Some("   ".to_string());
        assert!(!task.is_recurring());

        task.recurrence = Some("FREQ=DAILY".to_string());
        assert!(task.is_recurring());
    }

    #[test]
    fn test_project_names_skip_blank() {
        let mut task = TaskRecord::new("a.md", "A");
        task.projects = vec!["Alpha".to_string(), " ".to_string(), "Beta ".to_string()];
        assert_eq!(task.project_names(), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let task: TaskRecord =
            serde_json::from_str(r#"{"path": "t.md", "title": "T", "due": "2025-01-08"}"#)
                .unwrap();
        assert_eq!(task.due.as_deref(), Some("2025-01-08"));
        assert!(task.tags.is_empty());
        assert!(!task.archived);
    }
}
