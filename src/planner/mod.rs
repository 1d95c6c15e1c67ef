//! Query planning for crudplus
//!
//! Companions to the filter compiler: sort keys, eager-load and join
//! directives, and primary key predicates. All are pure functions of the
//! row type and their input.

mod primary_key;
mod relationship;
mod sort;

pub use primary_key::CompositeKeyResolver;
pub use relationship::{
    JoinDirective, JoinItem, JoinKind, JoinSpec, JoinsSpec, LoadDirective, LoadSpec, LoadStrategy,
    RelationshipPlanner,
};
pub use sort::{SortColumns, SortCompiler, SortDirection, SortKey, SortOrders, SortSpec};
