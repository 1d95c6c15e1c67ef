//! CRUD facade errors
//!
//! Compile errors pass through unchanged; unit-of-work failures are wrapped
//! as reported by the collaborator.

use thiserror::Error;

use super::unit_of_work::UnitOfWorkError;
use crate::errors::CompileError;

/// Result type for facade operations
pub type CrudResult<T> = Result<T, CrudError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrudError {
    /// Filter, sort, relationship or key compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Bulk update/delete called without any effective filter
    #[error("At least one filter condition must be provided for {operation} operation")]
    MissingFilter { operation: &'static str },

    /// More rows matched than the operation allows
    #[error("Only one record is expected to be {operation}, found {found} records")]
    MultipleResults { operation: &'static str, found: u64 },

    /// The unit of work reported a failure
    #[error(transparent)]
    UnitOfWork(#[from] UnitOfWorkError),

    /// The unit of work answered with the wrong kind of outcome
    #[error("Expected a {expected} outcome for {statement}, got {found}")]
    UnexpectedOutcome {
        statement: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl CrudError {
    pub fn code(&self) -> &'static str {
        match self {
            CrudError::Compile(err) => err.code(),
            CrudError::MissingFilter { .. } => "CRUD_MISSING_FILTER",
            CrudError::MultipleResults { .. } => "CRUD_MULTIPLE_RESULTS",
            CrudError::UnitOfWork(_) => "CRUD_UNIT_OF_WORK",
            CrudError::UnexpectedOutcome { .. } => "CRUD_UNEXPECTED_OUTCOME",
        }
    }
}
