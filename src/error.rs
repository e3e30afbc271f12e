//! Structured error types for query validation and evaluation.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (malformed or incomplete filter tree)
    MissingRequiredField,
    InvalidFieldValue,
    InvalidOperator,

    // Evaluation errors (contract violations reached at evaluation time)
    UnsupportedOperator,
    UnknownProperty,
}

impl ErrorCode {
    /// Validation codes describe the tree; the rest describe evaluation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorCode::MissingRequiredField
                | ErrorCode::InvalidFieldValue
                | ErrorCode::InvalidOperator
        )
    }
}

/// Structured error raised while validating or evaluating a filter query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl QueryError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            node_id: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn is_validation(&self) -> bool {
        self.code.is_validation()
    }

    // Convenience constructors

    pub fn missing_field(field: &str, node_id: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required on condition {}", field, node_id),
        )
        .with_field(field)
        .with_node(node_id)
    }

    pub fn invalid_value(field: &str, node_id: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason)
            .with_field(field)
            .with_node(node_id)
    }

    pub fn invalid_operator(property: &str, operator: &str, node_id: &str) -> Self {
        Self::new(
            ErrorCode::InvalidOperator,
            format!(
                "Operator '{}' is not valid for property '{}'",
                operator, property
            ),
        )
        .with_field("operator")
        .with_node(node_id)
    }

    pub fn unsupported_operator(property: &str, operator: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedOperator,
            format!(
                "Cannot evaluate operator '{}' against property '{}'",
                operator, property
            ),
        )
        .with_field("operator")
    }

    pub fn unknown_property(property: &str) -> Self {
        Self::new(
            ErrorCode::UnknownProperty,
            format!("Unknown property: {}", property),
        )
        .with_field("property")
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_id {
            Some(ref node) => write!(f, "{} (node {})", self.message, node),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for QueryError {}

/// Errors surfaced by engine operations.
///
/// Query errors never leave the public facade (they become empty results);
/// provider errors are handed back to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("index provider failure: {0}")]
    Provider(anyhow::Error),
}

impl EngineError {
    pub fn provider(err: impl Into<anyhow::Error>) -> Self {
        EngineError::Provider(err.into())
    }
}

/// Result type for query validation and evaluation.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
