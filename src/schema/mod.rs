//! Row type metadata for crudplus
//!
//! Descriptors are immutable once built and are safe to share across
//! threads. Every name referenced by a filter, sort, join or load spec is
//! resolved here, eagerly and fail-fast.

mod errors;
mod resolver;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use resolver::FieldResolver;
pub use types::{
    ColumnHandle, FieldDescriptor, Member, MemberKind, RelationshipDescriptor, RowTypeBuilder,
    RowTypeDescriptor,
};
