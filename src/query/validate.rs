//! Filter tree validation.
//!
//! Strict validation requires every condition to be fully populated and is
//! what decides whether a condition takes part in evaluation. Non-strict
//! validation is used while a query is still being built interactively: it
//! tolerates missing fields but still rejects operator/property mismatches.

use super::tree::{FilterCondition, FilterGroup, FilterNode};
use crate::error::{QueryError, QueryResult};

/// Validate any node of the tree.
pub fn validate(node: &FilterNode, strict: bool) -> QueryResult<()> {
    match node {
        FilterNode::Condition(condition) => validate_condition(condition, strict),
        FilterNode::Group(group) => validate_group(group, strict),
    }
}

/// Validate a group and everything below it.
pub fn validate_group(group: &FilterGroup, strict: bool) -> QueryResult<()> {
    group
        .children
        .iter()
        .try_for_each(|child| validate(child, strict))
}

/// Validate a single condition.
pub fn validate_condition(condition: &FilterCondition, strict: bool) -> QueryResult<()> {
    let id = condition.id.as_str();

    let property = match condition.property {
        Some(property) => property,
        None if strict => return Err(QueryError::missing_field("property", id)),
        None => return Ok(()),
    };

    let operator = match condition.operator {
        Some(operator) => operator,
        None if strict => return Err(QueryError::missing_field("operator", id)),
        None => return Ok(()),
    };

    if !property.supports(operator) {
        return Err(QueryError::invalid_operator(
            property.as_str(),
            operator.as_str(),
            id,
        ));
    }

    if strict && operator.requires_value() {
        match condition.value {
            None => return Err(QueryError::missing_field("value", id)),
            Some(ref value) if value.is_blank() => {
                return Err(QueryError::invalid_value(
                    "value",
                    id,
                    &format!("value for '{}' must not be blank", operator),
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Whether a condition is fully populated and well-formed.
pub fn is_complete(condition: &FilterCondition) -> bool {
    validate_condition(condition, true).is_ok()
}

/// Whether a node constrains evaluation at all.
///
/// Incomplete conditions are inert. A group is inert when it has children but
/// none of them are active; an empty group stays active and matches everything.
pub fn is_active(node: &FilterNode) -> bool {
    match node {
        FilterNode::Condition(condition) => is_complete(condition),
        FilterNode::Group(group) => {
            group.children.is_empty() || group.children.iter().any(is_active)
        }
    }
}
