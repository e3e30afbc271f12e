//! Operator semantics.
//!
//! [`apply_operator`] is pure: it compares an extracted property value with a
//! condition value. Equality is set-style, `contains` is case-insensitive,
//! and date operators resolve natural-language values first.

use super::access::PropertyValue;
use super::dates::{TaskDate, parse_task_date, resolve_date_value};
use super::tree::{ConditionValue, FilterOperator, FilterProperty, PropertyKind};
use crate::error::{QueryError, QueryResult};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Evaluate `operator` for a record's `task_value` against `value`.
///
/// Fails only when the operator is not defined for the property, which
/// validation should already have ruled out.
pub fn apply_operator(
    property: FilterProperty,
    task_value: &PropertyValue,
    operator: FilterOperator,
    value: Option<&ConditionValue>,
    today: NaiveDate,
) -> QueryResult<bool> {
    if !property.supports(operator) {
        return Err(QueryError::unsupported_operator(
            property.as_str(),
            operator.as_str(),
        ));
    }

    let result = match operator {
        FilterOperator::Is => is_equal(property, task_value, value, today),
        FilterOperator::IsNot => !is_equal(property, task_value, value, today),
        FilterOperator::Contains => contains(task_value, value),
        FilterOperator::DoesNotContain => !contains(task_value, value),
        FilterOperator::IsBefore => {
            compare_dates(task_value, value, today) == Some(Ordering::Less)
        }
        FilterOperator::IsAfter => {
            compare_dates(task_value, value, today) == Some(Ordering::Greater)
        }
        FilterOperator::IsOnOrBefore => matches!(
            compare_dates(task_value, value, today),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::IsOnOrAfter => matches!(
            compare_dates(task_value, value, today),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::IsEmpty => is_empty(task_value),
        FilterOperator::IsNotEmpty => !is_empty(task_value),
        FilterOperator::IsChecked => matches!(task_value, PropertyValue::Bool(true)),
        FilterOperator::IsNotChecked => !matches!(task_value, PropertyValue::Bool(true)),
        FilterOperator::IsGreaterThan => {
            compare_numbers(task_value, value) == Some(Ordering::Greater)
        }
        FilterOperator::IsLessThan => compare_numbers(task_value, value) == Some(Ordering::Less),
    };

    Ok(result)
}

/// Null, blank text, empty list, or a list of only blank strings.
pub fn is_empty(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Absent => true,
        PropertyValue::Text(s) => s.trim().is_empty(),
        PropertyValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        PropertyValue::Number(_) | PropertyValue::Bool(_) => false,
    }
}

/// Condition value as a list of string operands.
fn operands(value: Option<&ConditionValue>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(ConditionValue::Text(s)) => vec![s.clone()],
        Some(ConditionValue::List(items)) => items.clone(),
        Some(ConditionValue::Number(n)) => vec![n.to_string()],
        Some(ConditionValue::Bool(b)) => vec![b.to_string()],
    }
}

fn scalar_text(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Text(s) => Some(s.clone()),
        PropertyValue::Number(n) => Some(n.to_string()),
        PropertyValue::Bool(b) => Some(b.to_string()),
        PropertyValue::List(_) | PropertyValue::Absent => None,
    }
}

/// Exact string identity; numeric properties compare as numbers.
fn scalar_eq(property: FilterProperty, a: &str, b: &str) -> bool {
    if property.kind() == PropertyKind::Numeric
        && let (Ok(x), Ok(y)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>())
    {
        return x == y;
    }
    a == b
}

fn is_equal(
    property: FilterProperty,
    task_value: &PropertyValue,
    value: Option<&ConditionValue>,
    today: NaiveDate,
) -> bool {
    let wanted = operands(value);

    if property.is_date() {
        let Some(task_date) = task_date(task_value) else {
            return false;
        };
        return wanted
            .iter()
            .filter_map(|w| resolve_date_value(w, today))
            .any(|d| d.day == task_date.day);
    }

    match task_value {
        PropertyValue::Absent => false,
        PropertyValue::List(items) => items
            .iter()
            .any(|item| wanted.iter().any(|w| scalar_eq(property, item, w))),
        scalar => match scalar_text(scalar) {
            Some(actual) => wanted.iter().any(|w| scalar_eq(property, &actual, w)),
            None => false,
        },
    }
}

fn contains(task_value: &PropertyValue, value: Option<&ConditionValue>) -> bool {
    let wanted: Vec<String> = operands(value)
        .into_iter()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.trim().is_empty())
        .collect();
    if wanted.is_empty() {
        return false;
    }

    match task_value {
        PropertyValue::Absent => false,
        PropertyValue::List(items) => items.iter().any(|item| {
            let item = item.to_lowercase();
            wanted.iter().any(|w| item == *w)
        }),
        scalar => match scalar_text(scalar) {
            Some(actual) => {
                let actual = actual.to_lowercase();
                wanted.iter().any(|w| actual.contains(w.as_str()))
            }
            None => false,
        },
    }
}

fn task_date(task_value: &PropertyValue) -> Option<TaskDate> {
    match task_value {
        PropertyValue::Text(s) => parse_task_date(s),
        _ => None,
    }
}

/// Order the record's date against the condition date.
///
/// A bare condition date compares by calendar day; a condition date-time
/// compares by instant, with a bare record date preceding any same-day time.
fn compare_dates(
    task_value: &PropertyValue,
    value: Option<&ConditionValue>,
    today: NaiveDate,
) -> Option<Ordering> {
    let task = task_date(task_value)?;
    let wanted = operands(value)
        .first()
        .and_then(|w| resolve_date_value(w, today))?;

    if wanted.time.is_none() {
        Some(task.day.cmp(&wanted.day))
    } else {
        Some(task.cmp(&wanted))
    }
}

fn as_number(value: &PropertyValue) -> Option<f64> {
    match value {
        PropertyValue::Number(n) => Some(*n),
        PropertyValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn compare_numbers(task_value: &PropertyValue, value: Option<&ConditionValue>) -> Option<Ordering> {
    let actual = as_number(task_value)?;
    let wanted = match value? {
        ConditionValue::Number(n) => *n,
        ConditionValue::Text(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if actual.is_nan() || wanted.is_nan() {
        return None;
    }
    actual.partial_cmp(&wanted)
}
