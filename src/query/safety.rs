//! Index-safety analysis.
//!
//! Pruning the candidate set through an index is only sound when every
//! matching record must satisfy the indexed condition. A condition under any
//! OR group can be bypassed by a sibling branch, so its presence there
//! disables pruning for the whole query. Nested AND groups are transparent
//! for a single condition, but intersection is only attempted across direct
//! children of an AND root.

use super::dates::resolve_date_value;
use super::tree::{
    ConditionValue, Conjunction, FilterCondition, FilterGroup, FilterNode, FilterOperator,
    FilterProperty,
};
use super::validate::is_complete;
use chrono::NaiveDate;

/// A condition the index provider can answer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexableCondition {
    pub node_id: String,
    pub property: FilterProperty,
    pub operator: FilterOperator,
    pub value: String,
}

impl IndexableCondition {
    /// Cache key for the lookup, with relative dates resolved against `today`.
    pub fn cache_key(&self, today: NaiveDate) -> String {
        format!(
            "{}:{}:{}",
            self.property,
            self.operator,
            self.lookup_value(today)
        )
    }

    /// Value handed to the provider: a `YYYY-MM-DD` key for dates.
    pub fn lookup_value(&self, today: NaiveDate) -> String {
        if self.property.is_date() {
            resolve_date_value(&self.value, today)
                .map(|d| d.key())
                .unwrap_or_else(|| self.value.clone())
        } else {
            self.value.clone()
        }
    }
}

/// How candidates are narrowed before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum PruneStrategy {
    /// Load every record.
    FullScan,
    Single(IndexableCondition),
    /// Intersect the lookups of several root-level conditions.
    Intersect(Vec<IndexableCondition>),
}

/// Classify a condition as indexable.
///
/// Indexable: a complete status `is` with a scalar value, or a due/scheduled
/// `is` / bound comparison with a resolvable date value.
pub fn indexable(condition: &FilterCondition) -> Option<IndexableCondition> {
    if !is_complete(condition) {
        return None;
    }
    let property = condition.property?;
    let operator = condition.operator?;
    let value = match condition.value.as_ref()? {
        ConditionValue::Text(s) if !s.trim().is_empty() => s.clone(),
        _ => return None,
    };

    let supported = match property {
        FilterProperty::Status => operator == FilterOperator::Is,
        FilterProperty::Due | FilterProperty::Scheduled => {
            matches!(
                operator,
                FilterOperator::Is
                    | FilterOperator::IsBefore
                    | FilterOperator::IsAfter
                    | FilterOperator::IsOnOrBefore
                    | FilterOperator::IsOnOrAfter
            ) && resolves(&value)
        }
        _ => false,
    };

    supported.then(|| IndexableCondition {
        node_id: condition.id.clone(),
        property,
        operator,
        value,
    })
}

// Resolvability of a date value does not depend on the reference day.
fn resolves(value: &str) -> bool {
    resolve_date_value(value, NaiveDate::default()).is_some()
}

/// Whether any condition at or below `node` is indexable.
pub fn contains_indexable(node: &FilterNode) -> bool {
    match node {
        FilterNode::Condition(condition) => indexable(condition).is_some(),
        FilterNode::Group(group) => group.children.iter().any(contains_indexable),
    }
}

/// Whether some OR group at or below `group` holds an indexable condition.
fn or_hides_indexable(group: &FilterGroup) -> bool {
    if group.conjunction == Conjunction::Or && group.children.iter().any(contains_indexable) {
        return true;
    }
    group.children.iter().any(|child| match child {
        FilterNode::Group(inner) => or_hides_indexable(inner),
        FilterNode::Condition(_) => false,
    })
}

fn collect_indexable(group: &FilterGroup, out: &mut Vec<(IndexableCondition, bool)>, depth: usize) {
    for child in &group.children {
        match child {
            FilterNode::Condition(condition) => {
                if let Some(ix) = indexable(condition) {
                    out.push((ix, depth == 0));
                }
            }
            FilterNode::Group(inner) => collect_indexable(inner, out, depth + 1),
        }
    }
}

/// Decide whether and how `root` may be answered through indexes.
pub fn analyze(root: &FilterGroup) -> PruneStrategy {
    if or_hides_indexable(root) {
        return PruneStrategy::FullScan;
    }

    let mut found = Vec::new();
    collect_indexable(root, &mut found, 0);

    match found.len() {
        0 => PruneStrategy::FullScan,
        1 => PruneStrategy::Single(found.remove(0).0),
        _ if found.iter().all(|(_, top_level)| *top_level) => {
            PruneStrategy::Intersect(found.into_iter().map(|(ix, _)| ix).collect())
        }
        _ => PruneStrategy::FullScan,
    }
}
