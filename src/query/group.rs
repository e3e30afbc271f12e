//! Bucketing of sorted results.
//!
//! Records are walked in sorted order, so every bucket keeps the sort order.
//! Each group key has its own canonical bucket ordering.

use super::access::is_effectively_completed;
use super::dates::{TaskDate, parse_task_date};
use super::tree::GroupKey;
use crate::config::OverduePolicy;
use crate::recurrence::OccurrenceEvaluator;
use crate::registry::{PriorityRegistry, StatusRegistry};
use crate::types::TaskRecord;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const ALL_BUCKET: &str = "All";
pub const NO_PROJECT: &str = "No Project";
pub const NO_CONTEXT: &str = "No Context";
pub const NO_STATUS: &str = "No Status";
pub const NO_PRIORITY: &str = "No Priority";

/// A named, ordered slice of the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskGroup {
    pub name: String,
    pub tasks: Vec<TaskRecord>,
}

/// Date-relative categories, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateCategory {
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    Later,
    NoDate,
}

impl DateCategory {
    pub const ALL: [DateCategory; 6] = [
        DateCategory::Overdue,
        DateCategory::Today,
        DateCategory::Tomorrow,
        DateCategory::ThisWeek,
        DateCategory::Later,
        DateCategory::NoDate,
    ];

    /// Bucket label. The past category reads differently for scheduled dates.
    pub fn label(&self, key: GroupKey) -> &'static str {
        match self {
            DateCategory::Overdue if key == GroupKey::Scheduled => "Past scheduled",
            DateCategory::Overdue => "Overdue",
            DateCategory::Today => "Today",
            DateCategory::Tomorrow => "Tomorrow",
            DateCategory::ThisWeek => "This week",
            DateCategory::Later => "Later",
            DateCategory::NoDate => "No date",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.label(GroupKey::Due) == label || c.label(GroupKey::Scheduled) == label)
    }
}

/// Registries and dates the grouper consults.
pub struct GroupContext<'a> {
    pub statuses: &'a dyn StatusRegistry,
    pub priorities: &'a dyn PriorityRegistry,
    pub occurrences: &'a dyn OccurrenceEvaluator,
    pub today: NaiveDate,
    /// Date recurring records are bucketed against.
    pub reference_date: NaiveDate,
    pub overdue_policy: OverduePolicy,
}

impl GroupContext<'_> {
    /// Category of `date` relative to today.
    ///
    /// Past dates are overdue unless the policy excludes completed records
    /// and `record` is completed as of that date; those fall through to
    /// "Later".
    pub fn categorize(&self, record: &TaskRecord, date: Option<TaskDate>) -> DateCategory {
        let Some(date) = date else {
            return DateCategory::NoDate;
        };
        let day = date.day;
        let today = self.today;

        if day < today {
            let completed = self.overdue_policy == OverduePolicy::ExcludeCompleted
                && is_effectively_completed(record, self.statuses, day);
            if !completed {
                return DateCategory::Overdue;
            }
            return DateCategory::Later;
        }
        if day == today {
            return DateCategory::Today;
        }
        if Some(day) == today.succ_opt() {
            return DateCategory::Tomorrow;
        }
        let days_to_sunday = i64::from(6 - today.weekday().num_days_from_monday());
        if day <= today + Duration::days(days_to_sunday) {
            return DateCategory::ThisWeek;
        }
        DateCategory::Later
    }

    /// Whether `record` counts as overdue today.
    pub fn is_overdue(&self, record: &TaskRecord) -> bool {
        if record.is_recurring() {
            return false;
        }
        [&record.due, &record.scheduled]
            .into_iter()
            .flatten()
            .filter_map(|raw| parse_task_date(raw))
            .any(|date| self.categorize(record, Some(date)) == DateCategory::Overdue)
    }

    fn date_bucket(&self, record: &TaskRecord, key: GroupKey) -> DateCategory {
        let stored = match key {
            GroupKey::Scheduled => record.scheduled.as_deref(),
            _ => record.due.as_deref(),
        }
        .and_then(parse_task_date);

        if record.is_recurring() && self.occurrences.is_active_on(record, self.reference_date) {
            return self.categorize(record, Some(TaskDate::on(self.reference_date)));
        }
        self.categorize(record, stored)
    }

    fn bucket_names(&self, record: &TaskRecord, key: GroupKey) -> Vec<String> {
        match key {
            GroupKey::None => vec![ALL_BUCKET.to_string()],
            GroupKey::Project => {
                let projects = record.project_names();
                if projects.is_empty() {
                    vec![NO_PROJECT.to_string()]
                } else {
                    let mut names: Vec<String> = Vec::with_capacity(projects.len());
                    for project in projects {
                        if !names.iter().any(|n| n == project) {
                            names.push(project.to_string());
                        }
                    }
                    names
                }
            }
            GroupKey::Context => vec![
                record
                    .contexts
                    .iter()
                    .map(|c| c.trim())
                    .find(|c| !c.is_empty())
                    .unwrap_or(NO_CONTEXT)
                    .to_string(),
            ],
            GroupKey::Status => vec![non_blank(&record.status, NO_STATUS)],
            GroupKey::Priority => vec![non_blank(&record.priority, NO_PRIORITY)],
            GroupKey::Due | GroupKey::Scheduled => {
                vec![self.date_bucket(record, key).label(key).to_string()]
            }
        }
    }

    fn compare_buckets(&self, key: GroupKey, a: &str, b: &str) -> Ordering {
        match key {
            GroupKey::Priority => reserved_last(a, b, NO_PRIORITY).then_with(|| {
                self.priorities
                    .priority_weight(b)
                    .cmp(&self.priorities.priority_weight(a))
                    .then_with(|| a.cmp(b))
            }),
            GroupKey::Status => reserved_last(a, b, NO_STATUS).then_with(|| {
                self.statuses
                    .status_order(a)
                    .cmp(&self.statuses.status_order(b))
                    .then_with(|| a.cmp(b))
            }),
            GroupKey::Due | GroupKey::Scheduled => {
                DateCategory::from_label(a).cmp(&DateCategory::from_label(b))
            }
            GroupKey::Project => reserved_last(a, b, NO_PROJECT).then_with(|| a.cmp(b)),
            GroupKey::Context | GroupKey::None => a.cmp(b),
        }
    }
}

fn non_blank(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn reserved_last(a: &str, b: &str, reserved: &str) -> Ordering {
    (a == reserved).cmp(&(b == reserved))
}

/// Split sorted `tasks` into buckets for `key`.
pub fn group_tasks(tasks: Vec<TaskRecord>, key: GroupKey, ctx: &GroupContext<'_>) -> Vec<TaskGroup> {
    let mut buckets: HashMap<String, Vec<TaskRecord>> = HashMap::new();

    for record in tasks {
        let names = ctx.bucket_names(&record, key);
        let last = names.len().saturating_sub(1);
        for (i, name) in names.into_iter().enumerate() {
            let entry = buckets.entry(name).or_default();
            if i == last {
                entry.push(record);
                break;
            }
            entry.push(record.clone());
        }
    }

    let mut groups: Vec<TaskGroup> = buckets
        .into_iter()
        .map(|(name, tasks)| TaskGroup { name, tasks })
        .collect();
    groups.sort_by(|a, b| ctx.compare_buckets(key, &a.name, &b.name));
    groups
}
