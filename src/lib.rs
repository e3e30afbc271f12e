//! Task View Query Library
//!
//! Query engine for live task views: filter trees, index-safe candidate
//! pruning, sorting with tie-break chains and date-aware grouping.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod provider;
pub mod query;
pub mod recurrence;
pub mod registry;
pub mod types;
