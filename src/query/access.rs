//! Typed property extraction from task records.

use super::dates::format_day;
use super::tree::FilterProperty;
use crate::registry::StatusRegistry;
use crate::types::TaskRecord;
use chrono::NaiveDate;

/// A property value read off a record.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
    Bool(bool),
    Absent,
}

impl PropertyValue {
    fn from_optional(value: Option<&String>) -> Self {
        match value {
            Some(s) => PropertyValue::Text(s.clone()),
            None => PropertyValue::Absent,
        }
    }
}

/// Extract `property` from `record`.
///
/// `statuses` and `target_date` feed the derived completion property: a
/// recurring record is completed on a date only if that occurrence was.
pub fn get_value(
    record: &TaskRecord,
    property: FilterProperty,
    statuses: &dyn StatusRegistry,
    target_date: NaiveDate,
) -> PropertyValue {
    match property {
        FilterProperty::Title => PropertyValue::Text(record.title.clone()),
        FilterProperty::Status => PropertyValue::Text(record.status.clone()),
        FilterProperty::Priority => PropertyValue::Text(record.priority.clone()),
        FilterProperty::Tags => PropertyValue::List(record.tags.clone()),
        FilterProperty::Contexts => PropertyValue::List(record.contexts.clone()),
        FilterProperty::Projects => PropertyValue::List(record.projects.clone()),
        FilterProperty::Due => PropertyValue::from_optional(record.due.as_ref()),
        FilterProperty::Scheduled => PropertyValue::from_optional(record.scheduled.as_ref()),
        FilterProperty::CompletedDate => {
            PropertyValue::from_optional(record.completed_date.as_ref())
        }
        FilterProperty::DateCreated => PropertyValue::from_optional(record.date_created.as_ref()),
        FilterProperty::DateModified => {
            PropertyValue::from_optional(record.date_modified.as_ref())
        }
        FilterProperty::Archived => PropertyValue::Bool(record.archived),
        FilterProperty::TimeEstimate => match record.time_estimate {
            Some(minutes) => PropertyValue::Number(minutes as f64),
            None => PropertyValue::Absent,
        },
        FilterProperty::Recurrence => match record.recurrence {
            Some(ref rule) if !rule.trim().is_empty() => PropertyValue::Text(rule.clone()),
            _ => PropertyValue::Absent,
        },
        FilterProperty::IsCompleted => {
            PropertyValue::Bool(is_effectively_completed(record, statuses, target_date))
        }
    }
}

/// Completion as of `date`: per occurrence for recurring records, by status otherwise.
pub fn is_effectively_completed(
    record: &TaskRecord,
    statuses: &dyn StatusRegistry,
    date: NaiveDate,
) -> bool {
    if record.is_recurring() {
        let key = format_day(date);
        record.complete_instances.iter().any(|d| d.trim() == key)
    } else {
        statuses.is_completed_status(&record.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::ConfiguredStatuses;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_typed_values() {
        let statuses = ConfiguredStatuses::from_config(&Config::default());
        let mut task = TaskRecord::new("a.md", "Write report");
        task.tags = vec!["work".to_string()];
        task.time_estimate = Some(45);
        let today = day("2025-03-10");

        assert_eq!(
            get_value(&task, FilterProperty::Title, &statuses, today),
            PropertyValue::Text("Write report".to_string())
        );
        assert_eq!(
            get_value(&task, FilterProperty::Tags, &statuses, today),
            PropertyValue::List(vec!["work".to_string()])
        );
        assert_eq!(
            get_value(&task, FilterProperty::TimeEstimate, &statuses, today),
            PropertyValue::Number(45.0)
        );
        assert_eq!(
            get_value(&task, FilterProperty::Due, &statuses, today),
            PropertyValue::Absent
        );
        assert_eq!(
            get_value(&task, FilterProperty::Recurrence, &statuses, today),
            PropertyValue::Absent
        );
    }

    #[test]
    fn test_completion_is_per_occurrence_for_recurring() {
        let statuses = ConfiguredStatuses::from_config(&Config::default());
        let mut task = TaskRecord::new("r.md", "Standup");
        task.status = "done".to_string();
        task.recurrence = Some("FREQ=DAILY".to_string());
        task.complete_instances = vec!["2025-03-09".to_string()];

        assert!(is_effectively_completed(&task, &statuses, day("2025-03-09")));
        assert!(!is_effectively_completed(&task, &statuses, day("2025-03-10")));

        task.recurrence = None;
        assert!(is_effectively_completed(&task, &statuses, day("2025-03-10")));
    }
}
