//! Query construction helpers.
//!
//! Every helper takes the caller's query by reference and returns a new one;
//! the input is never modified.

use super::tree::{
    ConditionValue, Conjunction, FilterCondition, FilterGroup, FilterNode, FilterOperator,
    FilterProperty, FilterQuery,
};

pub const ROOT_ID: &str = "root";

/// Prefix of ids for nodes injected by quick toggles.
pub const QUICK_PREFIX: &str = "quick-";

/// Wrapper group id used when a quick toggle has to wrap an OR root.
const QUICK_ROOT_ID: &str = "quick-root";

/// A one-click visibility filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickToggle {
    Completed,
    Archived,
    Recurrent,
}

impl QuickToggle {
    pub fn node_id(&self) -> &'static str {
        match self {
            QuickToggle::Completed => "quick-hide-completed",
            QuickToggle::Archived => "quick-hide-archived",
            QuickToggle::Recurrent => "quick-hide-recurrent",
        }
    }

    /// Condition that hides the records this toggle controls.
    fn hiding_condition(&self) -> FilterCondition {
        let (property, operator) = match self {
            QuickToggle::Completed => (FilterProperty::IsCompleted, FilterOperator::IsNotChecked),
            QuickToggle::Archived => (FilterProperty::Archived, FilterOperator::IsNotChecked),
            QuickToggle::Recurrent => (FilterProperty::Recurrence, FilterOperator::IsEmpty),
        };
        FilterCondition::new(self.node_id(), property, operator, None)
    }
}

/// Empty AND root, default sort and no grouping.
pub fn default_query() -> FilterQuery {
    FilterQuery::new(FilterGroup::and(ROOT_ID, Vec::new()))
}

/// Copy of `query` with every node carrying a unique, non-blank id.
///
/// Blank or duplicate ids are replaced by path-derived ids (`root.0.1`).
pub fn normalize_query(query: &FilterQuery) -> FilterQuery {
    let mut normalized = query.clone();
    let mut seen = std::collections::HashSet::new();
    if normalized.root.id.trim().is_empty() {
        normalized.root.id = ROOT_ID.to_string();
    }
    seen.insert(normalized.root.id.clone());
    let root_path = normalized.root.id.clone();
    normalize_children(&mut normalized.root, &root_path, &mut seen);
    normalized
}

fn normalize_children(
    group: &mut FilterGroup,
    path: &str,
    seen: &mut std::collections::HashSet<String>,
) {
    for (i, child) in group.children.iter_mut().enumerate() {
        let generated = format!("{}.{}", path, i);
        let id = match child {
            FilterNode::Condition(c) => &mut c.id,
            FilterNode::Group(g) => &mut g.id,
        };
        if id.trim().is_empty() || seen.contains(id.as_str()) {
            let mut candidate = generated;
            while seen.contains(&candidate) {
                candidate.push('_');
            }
            *id = candidate;
        }
        seen.insert(id.clone());
        if let FilterNode::Group(g) = child {
            let child_path = g.id.clone();
            normalize_children(g, &child_path, seen);
        }
    }
}

/// Whether `toggle`'s hiding condition is present at the root.
pub fn is_hidden(query: &FilterQuery, toggle: QuickToggle) -> bool {
    query
        .root
        .children
        .iter()
        .any(|child| child.id() == toggle.node_id())
}

/// Copy of `query` with `toggle`'s records shown (`show = true`) or hidden.
pub fn set_quick_toggle(query: &FilterQuery, toggle: QuickToggle, show: bool) -> FilterQuery {
    let mut next = query.clone();
    next.root.children.retain(|child| child.id() != toggle.node_id());

    if !show {
        if next.root.conjunction == Conjunction::Or {
            // Hiding must narrow the whole query, not add an alternative.
            let inner = std::mem::replace(
                &mut next.root,
                FilterGroup::and(QUICK_ROOT_ID, Vec::new()),
            );
            next.root.children.push(inner.into());
        }
        next.root.children.push(toggle.hiding_condition().into());
    } else {
        unwrap_quick_root(&mut next.root);
    }
    next
}

// Drop the wrapper once only the original root is left in it.
fn unwrap_quick_root(root: &mut FilterGroup) {
    if root.id != QUICK_ROOT_ID || root.children.len() != 1 {
        return;
    }
    if let Some(FilterNode::Group(inner)) = root.children.pop() {
        *root = inner;
    }
}

pub fn toggle_show_completed(query: &FilterQuery, show: bool) -> FilterQuery {
    set_quick_toggle(query, QuickToggle::Completed, show)
}

pub fn toggle_show_archived(query: &FilterQuery, show: bool) -> FilterQuery {
    set_quick_toggle(query, QuickToggle::Archived, show)
}

pub fn toggle_show_recurrent(query: &FilterQuery, show: bool) -> FilterQuery {
    set_quick_toggle(query, QuickToggle::Recurrent, show)
}

/// Shorthand for a complete condition.
pub fn condition(
    id: &str,
    property: FilterProperty,
    operator: FilterOperator,
    value: Option<ConditionValue>,
) -> FilterNode {
    FilterCondition::new(id, property, operator, value).into()
}
