//! # Compile Errors
//!
//! Every failure here is a deterministic input-validation failure raised
//! before any statement reaches a unit of work. None is transient and none
//! is retried. Each variant carries the offending field, operator or value.
//!
//! Unknown filter operators are deliberately absent: they are skipped with a
//! diagnostic instead of failing the whole filter.

use serde_json::Value;
use thiserror::Error;

use crate::schema::MemberKind;

/// Result type for compile operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Filter, sort, relationship and key compilation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    // ==================
    // Field resolution
    // ==================
    /// Name does not exist on the row type
    #[error("{field} is not found in {type_name}")]
    FieldNotFound { type_name: String, field: String },

    /// Name exists but is the wrong kind of member
    #[error("{field} is a {found} of {type_name}, expected a {expected}")]
    InvalidFieldKind {
        type_name: String,
        field: String,
        expected: MemberKind,
        found: MemberKind,
    },

    // ==================
    // Filters
    // ==================
    /// Operator value has the wrong shape
    #[error("The value of the <{operator}> filter on {field} {reason}, got {value}")]
    InvalidOperatorValue {
        field: String,
        operator: String,
        value: Value,
        reason: &'static str,
    },

    /// Arithmetic operator used where only comparisons are allowed
    #[error("Nested arithmetic is not allowed: <{operator}> inside <{within}> on {field}")]
    NestedArithmeticNotAllowed {
        field: String,
        operator: String,
        within: String,
    },

    /// OR-group value is not a mapping
    #[error("OR-group filter value must be a mapping, got {0}")]
    InvalidOrGroupValue(Value),

    // ==================
    // Sorting
    // ==================
    /// Sort orders given without sort columns
    #[error("Sort orders provided without corresponding sort columns")]
    OrdersWithoutColumns,

    /// Column and order lists differ in length
    #[error("The length of sort columns ({columns}) and sort orders ({orders}) must match")]
    SortArityMismatch { columns: usize, orders: usize },

    /// Direction token other than `asc`/`desc`
    #[error("Sort order {0} is not supported, only `asc` and `desc`")]
    InvalidSortDirection(String),

    // ==================
    // Relationships
    // ==================
    /// Load strategy token not in the registry
    #[error("Invalid loading strategy {strategy} for {relationship}")]
    UnknownLoadStrategy {
        relationship: String,
        strategy: String,
    },

    /// Join kind token other than `inner`/`left`/`full`
    #[error("Invalid join type {kind} for {relationship}, only `inner`, `left` and `full`")]
    InvalidJoinKind { relationship: String, kind: String },

    // ==================
    // Primary keys
    // ==================
    /// Composite key value has the wrong number of components
    #[error("Composite primary key arity mismatch: expected {expected}, got {received}")]
    CompositeKeyArityError { expected: usize, received: usize },
}

impl CompileError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::FieldNotFound { .. } => "FIELD_NOT_FOUND",
            CompileError::InvalidFieldKind { .. } => "INVALID_FIELD_KIND",
            CompileError::InvalidOperatorValue { .. } => "INVALID_OPERATOR_VALUE",
            CompileError::NestedArithmeticNotAllowed { .. } => "NESTED_ARITHMETIC_NOT_ALLOWED",
            CompileError::InvalidOrGroupValue(_) => "INVALID_OR_GROUP_VALUE",
            CompileError::OrdersWithoutColumns => "ORDERS_WITHOUT_COLUMNS",
            CompileError::SortArityMismatch { .. } => "SORT_ARITY_MISMATCH",
            CompileError::InvalidSortDirection(_) => "INVALID_SORT_DIRECTION",
            CompileError::UnknownLoadStrategy { .. } => "UNKNOWN_LOAD_STRATEGY",
            CompileError::InvalidJoinKind { .. } => "INVALID_JOIN_KIND",
            CompileError::CompositeKeyArityError { .. } => "COMPOSITE_KEY_ARITY",
        }
    }

    pub(crate) fn field_not_found(type_name: &str, field: &str) -> Self {
        CompileError::FieldNotFound {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_value(
        field: &str,
        operator: &str,
        value: &Value,
        reason: &'static str,
    ) -> Self {
        CompileError::InvalidOperatorValue {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.clone(),
            reason,
        }
    }
}
