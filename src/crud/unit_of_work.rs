//! Unit-of-work boundary
//!
//! The collaborator that owns sessions, transactions and statement
//! execution. This crate only hands it statements.

use thiserror::Error;

use super::statement::{Outcome, Statement};

/// Failure reported by a unit of work
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unit of work failed: {message}")]
pub struct UnitOfWorkError {
    message: String,
}

impl UnitOfWorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Executes statements inside a session
pub trait UnitOfWork {
    /// Run one statement
    fn execute(&mut self, statement: Statement) -> Result<Outcome, UnitOfWorkError>;

    /// Push pending changes without ending the transaction
    fn flush(&mut self) -> Result<(), UnitOfWorkError>;

    /// Commit the current transaction
    fn commit(&mut self) -> Result<(), UnitOfWorkError>;
}
