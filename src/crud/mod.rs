//! CRUD facade and unit-of-work boundary
//!
//! `Crud` compiles caller input into declarative `Statement`s and hands
//! them to a `UnitOfWork`. It never opens connections or runs SQL.

mod errors;
mod facade;
mod statement;
mod unit_of_work;

pub use errors::{CrudError, CrudResult};
pub use facade::{Crud, DeleteOptions, SelectQuery, UpdateOptions, WriteOptions};
pub use statement::{
    Assignment, CountStatement, DeleteStatement, InsertStatement, Outcome, SelectStatement,
    Statement, UpdateStatement,
};
pub use unit_of_work::{UnitOfWork, UnitOfWorkError};
