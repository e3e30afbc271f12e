//! Filter trees and the engine that evaluates them.

pub mod access;
pub mod builder;
pub mod cache;
pub mod candidates;
pub mod dates;
pub mod engine;
pub mod evaluate;
pub mod group;
pub mod operators;
pub mod safety;
pub mod sort;
pub mod tree;
pub mod validate;

pub use builder::{
    QuickToggle, default_query, normalize_query, set_quick_toggle, toggle_show_archived,
    toggle_show_completed, toggle_show_recurrent,
};
pub use engine::{EngineEvent, QueryEngine};
pub use group::{DateCategory, TaskGroup};
pub use safety::{PruneStrategy, analyze};
pub use tree::{
    ConditionValue, Conjunction, FilterCondition, FilterGroup, FilterNode, FilterOperator,
    FilterProperty, FilterQuery, GroupKey, SortDirection, SortKey,
};
pub use validate::{is_active, is_complete, validate};
