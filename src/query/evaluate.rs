//! Recursive filter evaluation.

use super::access::get_value;
use super::operators::apply_operator;
use super::tree::{Conjunction, FilterCondition, FilterGroup, FilterNode};
use super::validate::{is_active, is_complete};
use crate::error::QueryResult;
use crate::registry::StatusRegistry;
use crate::types::TaskRecord;
use chrono::NaiveDate;

/// Inputs evaluation needs besides the record.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub statuses: &'a dyn StatusRegistry,
    /// Resolves relative date values.
    pub today: NaiveDate,
    /// Date that occurrence-aware properties are evaluated for.
    pub target_date: NaiveDate,
}

pub fn evaluate_node(node: &FilterNode, record: &TaskRecord, ctx: &EvalContext<'_>) -> QueryResult<bool> {
    match node {
        FilterNode::Condition(condition) => evaluate_condition(condition, record, ctx),
        FilterNode::Group(group) => evaluate_group(group, record, ctx),
    }
}

/// Evaluate a group over its active children.
///
/// A group with no active children places no constraint and matches.
pub fn evaluate_group(group: &FilterGroup, record: &TaskRecord, ctx: &EvalContext<'_>) -> QueryResult<bool> {
    let mut active = group.children.iter().filter(|child| is_active(child)).peekable();
    if active.peek().is_none() {
        return Ok(true);
    }

    match group.conjunction {
        Conjunction::And => {
            for child in active {
                if !evaluate_node(child, record, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Conjunction::Or => {
            for child in active {
                if evaluate_node(child, record, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Evaluate one condition. Incomplete conditions match everything.
pub fn evaluate_condition(
    condition: &FilterCondition,
    record: &TaskRecord,
    ctx: &EvalContext<'_>,
) -> QueryResult<bool> {
    if !is_complete(condition) {
        return Ok(true);
    }
    let (Some(property), Some(operator)) = (condition.property, condition.operator) else {
        return Ok(true);
    };

    let value = get_value(record, property, ctx.statuses, ctx.target_date);
    apply_operator(property, &value, operator, condition.value.as_ref(), ctx.today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::query::tree::{ConditionValue, FilterOperator, FilterProperty};
    use crate::registry::ConfiguredStatuses;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn status_is(value: &str) -> FilterNode {
        FilterCondition::new(
            "s",
            FilterProperty::Status,
            FilterOperator::Is,
            Some(ConditionValue::text(value)),
        )
        .into()
    }

    fn incomplete() -> FilterNode {
        FilterCondition {
            id: "x".to_string(),
            property: Some(FilterProperty::Title),
            operator: None,
            value: None,
        }
        .into()
    }

    fn check(group: &FilterGroup, record: &TaskRecord) -> bool {
        let statuses = ConfiguredStatuses::from_config(&Config::default());
        let ctx = EvalContext {
            statuses: &statuses,
            today: day("2025-03-10"),
            target_date: day("2025-03-10"),
        };
        evaluate_group(group, record, &ctx).unwrap()
    }

    fn open_task() -> TaskRecord {
        let mut t = TaskRecord::new("a.md", "A");
        t.status = "open".to_string();
        t
    }

    #[test]
    fn test_and_or() {
        let task = open_task();
        assert!(check(&FilterGroup::and("r", vec![status_is("open")]), &task));
        assert!(!check(
            &FilterGroup::and("r", vec![status_is("open"), status_is("done")]),
            &task
        ));
        assert!(check(
            &FilterGroup::or("r", vec![status_is("done"), status_is("open")]),
            &task
        ));
        assert!(!check(&FilterGroup::or("r", vec![status_is("done")]), &task));
    }

    #[test]
    fn test_empty_and_inert_groups_match() {
        let task = open_task();
        assert!(check(&FilterGroup::and("r", vec![]), &task));
        assert!(check(&FilterGroup::or("r", vec![]), &task));
        assert!(check(&FilterGroup::or("r", vec![incomplete()]), &task));
    }

    #[test]
    fn test_incomplete_condition_is_neutral() {
        let task = open_task();
        let with = FilterGroup::or("r", vec![status_is("done"), incomplete()]);
        let without = FilterGroup::or("r", vec![status_is("done")]);
        assert_eq!(check(&with, &task), check(&without, &task));
        assert!(!check(&with, &task));
    }

    #[test]
    fn test_inert_nested_group_does_not_count_under_or() {
        let task = open_task();
        let root = FilterGroup::or(
            "r",
            vec![
                status_is("done"),
                FilterGroup::and("g", vec![incomplete()]).into(),
            ],
        );
        assert!(!check(&root, &task));
    }

    #[test]
    fn test_completion_tracks_target_date() {
        let statuses = ConfiguredStatuses::from_config(&Config::default());
        let mut task = open_task();
        task.recurrence = Some("FREQ=DAILY".to_string());
        task.complete_instances = vec!["2025-03-11".to_string()];
        let root = FilterGroup::and(
            "r",
            vec![
                FilterCondition::new(
                    "c",
                    FilterProperty::IsCompleted,
                    FilterOperator::IsChecked,
                    None,
                )
                .into(),
            ],
        );

        let on = |target: &str| {
            let ctx = EvalContext {
                statuses: &statuses,
                today: day("2025-03-10"),
                target_date: day(target),
            };
            evaluate_group(&root, &task, &ctx).unwrap()
        };
        assert!(!on("2025-03-10"));
        assert!(on("2025-03-11"));
    }
}
