//! Result ordering.
//!
//! Records are compared on the primary key, then through the fallback chain
//! scheduled, due, priority, title (skipping the primary). Direction flips
//! the combined comparison, except that a record missing the primary date
//! always sorts after dated ones.

use super::dates::{TaskDate, parse_task_date};
use super::tree::{SortDirection, SortKey};
use crate::registry::PriorityRegistry;
use crate::types::TaskRecord;
use std::cmp::Ordering;

const FALLBACK_CHAIN: [SortKey; 4] = [
    SortKey::Scheduled,
    SortKey::Due,
    SortKey::Priority,
    SortKey::Title,
];

/// Stable in-place sort.
pub fn sort_tasks(
    tasks: &mut [TaskRecord],
    key: SortKey,
    direction: SortDirection,
    priorities: &dyn PriorityRegistry,
) {
    tasks.sort_by(|a, b| compare_tasks(a, b, key, direction, priorities));
}

pub fn compare_tasks(
    a: &TaskRecord,
    b: &TaskRecord,
    key: SortKey,
    direction: SortDirection,
    priorities: &dyn PriorityRegistry,
) -> Ordering {
    if let (Some(da), Some(db)) = (date_for(a, key), date_for(b, key)) {
        match (da, db) {
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            _ => {}
        }
    }

    let combined = std::iter::once(key)
        .chain(FALLBACK_CHAIN.into_iter().filter(|k| *k != key))
        .map(|k| compare_on(a, b, k, priorities))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal);

    match direction {
        SortDirection::Asc => combined,
        SortDirection::Desc => combined.reverse(),
    }
}

/// For date keys, the record's parsed date (`Some(None)` when missing).
fn date_for(record: &TaskRecord, key: SortKey) -> Option<Option<TaskDate>> {
    let raw = match key {
        SortKey::Due => &record.due,
        SortKey::Scheduled => &record.scheduled,
        SortKey::DateCreated => &record.date_created,
        SortKey::Priority | SortKey::Title => return None,
    };
    Some(raw.as_deref().and_then(parse_task_date))
}

fn compare_on(
    a: &TaskRecord,
    b: &TaskRecord,
    key: SortKey,
    priorities: &dyn PriorityRegistry,
) -> Ordering {
    match (date_for(a, key), date_for(b, key)) {
        (Some(da), Some(db)) => compare_dates(da, db),
        _ => match key {
            // Heavier priorities first.
            SortKey::Priority => priorities
                .priority_weight(&b.priority)
                .cmp(&priorities.priority_weight(&a.priority)),
            _ => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        },
    }
}

fn compare_dates(a: Option<TaskDate>, b: Option<TaskDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::ConfiguredPriorities;

    fn task(path: &str, due: Option<&str>, priority: &str) -> TaskRecord {
        let mut t = TaskRecord::new(path, path);
        t.due = due.map(str::to_string);
        t.priority = priority.to_string();
        t
    }

    fn paths(tasks: &[TaskRecord]) -> Vec<&str> {
        tasks.iter().map(|t| t.path.as_str()).collect()
    }

    fn sorted(mut tasks: Vec<TaskRecord>, key: SortKey, direction: SortDirection) -> Vec<TaskRecord> {
        let priorities = ConfiguredPriorities::from_config(&Config::default());
        sort_tasks(&mut tasks, key, direction, &priorities);
        tasks
    }

    #[test]
    fn test_due_ascending_with_time_and_missing_last() {
        let tasks = vec![
            task("none", None, "normal"),
            task("timed", Some("2025-03-10T09:00"), "normal"),
            task("later", Some("2025-03-12"), "normal"),
            task("bare", Some("2025-03-10"), "normal"),
        ];
        let out = sorted(tasks, SortKey::Due, SortDirection::Asc);
        assert_eq!(paths(&out), vec!["bare", "timed", "later", "none"]);
    }

    #[test]
    fn test_missing_date_last_when_descending() {
        let tasks = vec![
            task("none", None, "normal"),
            task("early", Some("2025-03-01"), "normal"),
            task("late", Some("2025-03-20"), "normal"),
        ];
        let out = sorted(tasks, SortKey::Due, SortDirection::Desc);
        assert_eq!(paths(&out), vec!["late", "early", "none"]);
    }

    #[test]
    fn test_priority_heaviest_first_with_title_fallback() {
        let tasks = vec![
            task("b-low", None, "low"),
            task("a-high", None, "high"),
            task("c-high", None, "high"),
            task("d-unknown", None, "whatever"),
        ];
        let out = sorted(tasks, SortKey::Priority, SortDirection::Asc);
        assert_eq!(paths(&out), vec!["a-high", "c-high", "b-low", "d-unknown"]);
    }

    #[test]
    fn test_fallback_uses_scheduled_then_due() {
        let mut a = task("a", None, "normal");
        a.title = "Same".to_string();
        a.scheduled = Some("2025-03-05".to_string());
        let mut b = task("b", None, "normal");
        b.title = "Same".to_string();
        b.scheduled = Some("2025-03-04".to_string());
        let out = sorted(vec![a, b], SortKey::Title, SortDirection::Asc);
        assert_eq!(paths(&out), vec!["b", "a"]);
    }

    #[test]
    fn test_descending_reverses_the_fallback_chain_too() {
        let mut a = task("a", None, "high");
        a.title = "Same".to_string();
        a.scheduled = Some("2025-03-05".to_string());
        let mut b = task("b", None, "high");
        b.title = "Same".to_string();
        b.scheduled = Some("2025-03-04".to_string());
        let c = task("c", None, "low");

        let tasks = vec![a, b, c];
        let out = sorted(tasks.clone(), SortKey::Priority, SortDirection::Asc);
        assert_eq!(paths(&out), vec!["b", "a", "c"]);
        let out = sorted(tasks, SortKey::Priority, SortDirection::Desc);
        assert_eq!(paths(&out), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_date_created_missing_last_both_directions() {
        let mut early = task("early", None, "normal");
        early.date_created = Some("2025-03-01T08:00".to_string());
        let mut late = task("late", None, "normal");
        late.date_created = Some("2025-03-05".to_string());
        let unknown = task("unknown", None, "normal");
        let tasks = vec![unknown, late, early];

        let out = sorted(tasks.clone(), SortKey::DateCreated, SortDirection::Asc);
        assert_eq!(paths(&out), vec!["early", "late", "unknown"]);
        let out = sorted(tasks, SortKey::DateCreated, SortDirection::Desc);
        assert_eq!(paths(&out), vec!["late", "early", "unknown"]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let mut x = task("x", Some("2025-03-10"), "normal");
        x.title = "Same".to_string();
        let mut y = task("y", Some("2025-03-10"), "normal");
        y.title = "Same".to_string();
        let out = sorted(vec![x.clone(), y.clone()], SortKey::Due, SortDirection::Asc);
        assert_eq!(paths(&out), vec!["x", "y"]);
        let out = sorted(vec![y, x], SortKey::Due, SortDirection::Desc);
        assert_eq!(paths(&out), vec!["y", "x"]);
    }
}
