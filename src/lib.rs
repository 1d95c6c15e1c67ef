//! crudplus - declarative filter, sort and relationship compilation for
//! generic CRUD over relational row types
//!
//! The compilers never touch a connection: they turn caller input into
//! predicate trees and directives, and the `crud` facade packages those
//! into statements for an external unit of work.

pub mod config;
pub mod crud;
pub mod errors;
pub mod filter;
pub mod observability;
pub mod planner;
pub mod schema;

pub use config::{CompilerConfig, ConfigError, ConfigResult};
pub use crud::{Crud, CrudError, CrudResult, SelectQuery, UnitOfWork};
pub use errors::{CompileError, CompileResult};
pub use filter::{FilterCompiler, OperatorRegistry, PredicateNode};
pub use planner::{CompositeKeyResolver, RelationshipPlanner, SortCompiler};
pub use schema::{FieldResolver, RowTypeDescriptor};
