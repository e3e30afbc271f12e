//! Filter tree data model.
//!
//! A query is a tree of [`FilterNode`]s rooted at a [`FilterGroup`]. The tree
//! is plain data: validation, index analysis and evaluation each walk it with
//! a single exhaustive match over the node kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Properties a condition can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterProperty {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "tags")]
    Tags,
    #[serde(rename = "contexts")]
    Contexts,
    #[serde(rename = "projects")]
    Projects,
    #[serde(rename = "due")]
    Due,
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "completedDate")]
    CompletedDate,
    #[serde(rename = "dateCreated")]
    DateCreated,
    #[serde(rename = "dateModified")]
    DateModified,
    #[serde(rename = "archived")]
    Archived,
    #[serde(rename = "timeEstimate")]
    TimeEstimate,
    /// Derived: whether the record carries a recurrence rule.
    #[serde(rename = "recurrence")]
    Recurrence,
    /// Derived: effective completion, occurrence-aware for recurring records.
    #[serde(rename = "status.isCompleted")]
    IsCompleted,
}

/// Value shape a property yields, which fixes its operator allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Selection,
    List,
    Date,
    Boolean,
    Numeric,
    Presence,
}

impl FilterProperty {
    pub const ALL: [FilterProperty; 15] = [
        FilterProperty::Title,
        FilterProperty::Status,
        FilterProperty::Priority,
        FilterProperty::Tags,
        FilterProperty::Contexts,
        FilterProperty::Projects,
        FilterProperty::Due,
        FilterProperty::Scheduled,
        FilterProperty::CompletedDate,
        FilterProperty::DateCreated,
        FilterProperty::DateModified,
        FilterProperty::Archived,
        FilterProperty::TimeEstimate,
        FilterProperty::Recurrence,
        FilterProperty::IsCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterProperty::Title => "title",
            FilterProperty::Status => "status",
            FilterProperty::Priority => "priority",
            FilterProperty::Tags => "tags",
            FilterProperty::Contexts => "contexts",
            FilterProperty::Projects => "projects",
            FilterProperty::Due => "due",
            FilterProperty::Scheduled => "scheduled",
            FilterProperty::CompletedDate => "completedDate",
            FilterProperty::DateCreated => "dateCreated",
            FilterProperty::DateModified => "dateModified",
            FilterProperty::Archived => "archived",
            FilterProperty::TimeEstimate => "timeEstimate",
            FilterProperty::Recurrence => "recurrence",
            FilterProperty::IsCompleted => "status.isCompleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            FilterProperty::Title => PropertyKind::Text,
            FilterProperty::Status | FilterProperty::Priority => PropertyKind::Selection,
            FilterProperty::Tags | FilterProperty::Contexts | FilterProperty::Projects => {
                PropertyKind::List
            }
            FilterProperty::Due
            | FilterProperty::Scheduled
            | FilterProperty::CompletedDate
            | FilterProperty::DateCreated
            | FilterProperty::DateModified => PropertyKind::Date,
            FilterProperty::Archived | FilterProperty::IsCompleted => PropertyKind::Boolean,
            FilterProperty::TimeEstimate => PropertyKind::Numeric,
            FilterProperty::Recurrence => PropertyKind::Presence,
        }
    }

    /// Operators this property accepts.
    pub fn operators(&self) -> &'static [FilterOperator] {
        use FilterOperator::*;
        match self.kind() {
            PropertyKind::Text => &[Is, IsNot, Contains, DoesNotContain, IsEmpty, IsNotEmpty],
            PropertyKind::Selection => &[Is, IsNot, IsEmpty, IsNotEmpty],
            PropertyKind::List => &[Contains, DoesNotContain, IsEmpty, IsNotEmpty],
            PropertyKind::Date => &[
                Is,
                IsNot,
                IsBefore,
                IsAfter,
                IsOnOrBefore,
                IsOnOrAfter,
                IsEmpty,
                IsNotEmpty,
            ],
            PropertyKind::Boolean => &[IsChecked, IsNotChecked],
            PropertyKind::Numeric => &[Is, IsNot, IsGreaterThan, IsLessThan, IsEmpty, IsNotEmpty],
            PropertyKind::Presence => &[IsEmpty, IsNotEmpty],
        }
    }

    pub fn supports(&self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }

    pub fn is_date(&self) -> bool {
        self.kind() == PropertyKind::Date
    }
}

impl fmt::Display for FilterProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    Is,
    IsNot,
    Contains,
    DoesNotContain,
    IsBefore,
    IsAfter,
    IsOnOrBefore,
    IsOnOrAfter,
    IsEmpty,
    IsNotEmpty,
    IsChecked,
    IsNotChecked,
    IsGreaterThan,
    IsLessThan,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Is => "is",
            FilterOperator::IsNot => "is-not",
            FilterOperator::Contains => "contains",
            FilterOperator::DoesNotContain => "does-not-contain",
            FilterOperator::IsBefore => "is-before",
            FilterOperator::IsAfter => "is-after",
            FilterOperator::IsOnOrBefore => "is-on-or-before",
            FilterOperator::IsOnOrAfter => "is-on-or-after",
            FilterOperator::IsEmpty => "is-empty",
            FilterOperator::IsNotEmpty => "is-not-empty",
            FilterOperator::IsChecked => "is-checked",
            FilterOperator::IsNotChecked => "is-not-checked",
            FilterOperator::IsGreaterThan => "is-greater-than",
            FilterOperator::IsLessThan => "is-less-than",
        }
    }

    /// Whether a condition using this operator needs a value to be complete.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            FilterOperator::IsEmpty
                | FilterOperator::IsNotEmpty
                | FilterOperator::IsChecked
                | FilterOperator::IsNotChecked
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value on the right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ConditionValue {
    pub fn text(s: impl Into<String>) -> Self {
        ConditionValue::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConditionValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Blank strings and empty lists do not count as a value.
    pub fn is_blank(&self) -> bool {
        match self {
            ConditionValue::Text(s) => s.trim().is_empty(),
            ConditionValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
            ConditionValue::Bool(_) | ConditionValue::Number(_) => false,
        }
    }

    /// Canonical string form used in cache keys.
    pub fn cache_repr(&self) -> String {
        match self {
            ConditionValue::Bool(b) => b.to_string(),
            ConditionValue::Number(n) => n.to_string(),
            ConditionValue::Text(s) => s.clone(),
            ConditionValue::List(items) => items.join(","),
        }
    }
}

/// Leaf of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub id: String,
    #[serde(default)]
    pub property: Option<FilterProperty>,
    #[serde(default)]
    pub operator: Option<FilterOperator>,
    #[serde(default)]
    pub value: Option<ConditionValue>,
}

impl FilterCondition {
    pub fn new(
        id: impl Into<String>,
        property: FilterProperty,
        operator: FilterOperator,
        value: Option<ConditionValue>,
    ) -> Self {
        Self {
            id: id.into(),
            property: Some(property),
            operator: Some(operator),
            value,
        }
    }
}

/// Boolean connective for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

/// Interior node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: String,
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(default)]
    pub children: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn new(id: impl Into<String>, conjunction: Conjunction, children: Vec<FilterNode>) -> Self {
        Self {
            id: id.into(),
            conjunction,
            children,
        }
    }

    pub fn and(id: impl Into<String>, children: Vec<FilterNode>) -> Self {
        Self::new(id, Conjunction::And, children)
    }

    pub fn or(id: impl Into<String>, children: Vec<FilterNode>) -> Self {
        Self::new(id, Conjunction::Or, children)
    }
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterNode {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn id(&self) -> &str {
        match self {
            FilterNode::Condition(c) => &c.id,
            FilterNode::Group(g) => &g.id,
        }
    }
}

impl From<FilterCondition> for FilterNode {
    fn from(condition: FilterCondition) -> Self {
        FilterNode::Condition(condition)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}

/// Primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "due")]
    Due,
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "dateCreated")]
    DateCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// How results are bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    #[default]
    None,
    Status,
    Priority,
    Context,
    Project,
    Due,
    Scheduled,
}

/// A complete filter query: tree plus presentation keys.
///
/// Treated as an immutable value. Helpers that edit a query return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub root: FilterGroup,
    #[serde(default)]
    pub sort_key: SortKey,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub group_key: GroupKey,
}

impl FilterQuery {
    pub fn new(root: FilterGroup) -> Self {
        Self {
            root,
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            group_key: GroupKey::default(),
        }
    }

    pub fn with_sort(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.sort_direction = direction;
        self
    }

    pub fn with_group(mut self, key: GroupKey) -> Self {
        self.group_key = key;
        self
    }
}
