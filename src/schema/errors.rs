//! Descriptor construction errors
//!
//! Raised while a `RowTypeDescriptor` is being built. Once a descriptor
//! exists it is immutable, so these never occur during compilation.

use thiserror::Error;

/// Result type for descriptor construction
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Descriptor construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two members (fields or relationships) share a name
    #[error("Member '{member}' is declared twice on '{type_name}'")]
    DuplicateMember { type_name: String, member: String },

    /// No primary key was declared
    #[error("Row type '{0}' declares no primary key")]
    MissingPrimaryKey(String),

    /// A primary key name is not a declared scalar field
    #[error("Primary key '{member}' is not a scalar field of '{type_name}'")]
    InvalidPrimaryKey { type_name: String, member: String },
}

impl SchemaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateMember { .. } => "SCHEMA_DUPLICATE_MEMBER",
            SchemaError::MissingPrimaryKey(_) => "SCHEMA_MISSING_PRIMARY_KEY",
            SchemaError::InvalidPrimaryKey { .. } => "SCHEMA_INVALID_PRIMARY_KEY",
        }
    }
}
