//! # CRUD Facade
//!
//! Generic create/read/update/delete over one row type. Every operation
//! compiles its inputs first, so a malformed filter, sort, join or key
//! never reaches the unit of work. Execution, flush and commit are the
//! unit of work's business.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::errors::{CrudError, CrudResult};
use super::statement::{
    Assignment, CountStatement, DeleteStatement, InsertStatement, Outcome, SelectStatement,
    Statement, UpdateStatement,
};
use super::unit_of_work::UnitOfWork;
use crate::config::CompilerConfig;
use crate::filter::{FilterCompiler, PredicateNode};
use crate::observability::{Event, Logger};
use crate::planner::{
    CompositeKeyResolver, JoinsSpec, LoadSpec, RelationshipPlanner, SortColumns, SortCompiler,
    SortOrders,
};
use crate::schema::{FieldResolver, RowTypeDescriptor};

/// Flush/commit behaviour after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    pub flush: bool,
    pub commit: bool,
}

impl WriteOptions {
    /// Flush after the write
    pub fn flush() -> Self {
        Self {
            flush: true,
            commit: false,
        }
    }

    /// Commit after the write
    pub fn commit() -> Self {
        Self {
            flush: false,
            commit: true,
        }
    }
}

/// Options for `update_model_by_column`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// Allow more than one matching row
    pub allow_multiple: bool,
    pub write: WriteOptions,
}

/// Options for `delete_model_by_column`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOptions {
    /// Allow more than one matching row
    pub allow_multiple: bool,
    /// Set the logical deletion flag instead of deleting
    pub logical_deletion: bool,
    pub write: WriteOptions,
}

/// Read query: filters, relationship loading, joins and paging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub filters: Map<String, Value>,
    pub load: Option<LoadSpec>,
    pub joins: Option<JoinsSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one filter entry
    pub fn filter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.filters.insert(key.into(), value);
        self
    }

    /// Replace all filters
    pub fn filters(mut self, filters: Map<String, Value>) -> Self {
        self.filters = filters;
        self
    }

    pub fn load(mut self, spec: LoadSpec) -> Self {
        self.load = Some(spec);
        self
    }

    pub fn joins(mut self, spec: JoinsSpec) -> Self {
        self.joins = Some(spec);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// CRUD operations over one row type
#[derive(Debug, Clone)]
pub struct Crud {
    ty: Arc<RowTypeDescriptor>,
    filters: FilterCompiler,
    planner: RelationshipPlanner,
}

impl Crud {
    pub fn new(ty: Arc<RowTypeDescriptor>) -> Self {
        Self::with_config(ty, CompilerConfig::default())
    }

    pub fn with_config(ty: Arc<RowTypeDescriptor>, config: CompilerConfig) -> Self {
        Self {
            ty,
            planner: RelationshipPlanner::new(&config),
            filters: FilterCompiler::new(config),
        }
    }

    pub fn row_type(&self) -> &RowTypeDescriptor {
        &self.ty
    }

    // ==================
    // Create
    // ==================

    /// Insert one row
    pub fn create_model<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        row: &Map<String, Value>,
        options: WriteOptions,
    ) -> CrudResult<u64> {
        self.create_models(uow, std::slice::from_ref(row), options)
    }

    /// Insert rows in one statement
    pub fn create_models<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        rows: &[Map<String, Value>],
        options: WriteOptions,
    ) -> CrudResult<u64> {
        let rows = rows
            .iter()
            .map(|row| self.assignments(row))
            .collect::<CrudResult<Vec<_>>>()?;

        let statement = Statement::Insert(InsertStatement {
            table: self.ty.table().to_string(),
            rows,
        });
        let affected = expect_affected(dispatch(uow, statement)?, "insert")?;
        finish(uow, options)?;
        Ok(affected)
    }

    // ==================
    // Read
    // ==================

    /// Count rows matching `filters`
    pub fn count<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        filters: &Map<String, Value>,
        joins: Option<&JoinsSpec>,
    ) -> CrudResult<u64> {
        let predicates = self.filters.compile(&self.ty, filters)?;
        self.count_predicates(uow, predicates, joins)
    }

    /// Whether any row matches `filters`
    pub fn exists<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        filters: &Map<String, Value>,
        joins: Option<&JoinsSpec>,
    ) -> CrudResult<bool> {
        let mut statement = SelectStatement::new(self.ty.table());
        statement.predicates = self.filters.compile(&self.ty, filters)?;
        if let Some(joins) = joins {
            statement.joins = self.planner.build_joins(&self.ty, joins)?;
        }
        statement.limit = Some(1);

        let rows = expect_rows(dispatch(uow, Statement::Select(statement))?)?;
        Ok(!rows.is_empty())
    }

    /// Build a select statement without running it
    pub fn select(&self, query: &SelectQuery) -> CrudResult<SelectStatement> {
        let mut statement = SelectStatement::new(self.ty.table());
        statement.predicates = self.filters.compile(&self.ty, &query.filters)?;
        if let Some(joins) = &query.joins {
            statement.joins = self.planner.build_joins(&self.ty, joins)?;
        }
        if let Some(load) = &query.load {
            statement.loads = self.planner.build_load_strategies(&self.ty, load)?;
        }
        statement.limit = query.limit;
        statement.offset = query.offset;
        Ok(statement)
    }

    /// Build a sorted select statement without running it
    pub fn select_order(
        &self,
        query: &SelectQuery,
        columns: impl Into<SortColumns>,
        orders: Option<SortOrders>,
    ) -> CrudResult<SelectStatement> {
        let mut statement = self.select(query)?;
        statement.order_by = SortCompiler::compile(&self.ty, columns, orders)?;
        Ok(statement)
    }

    /// First row with primary key `pk` that also matches the query
    pub fn select_model<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        pk: &Value,
        query: &SelectQuery,
    ) -> CrudResult<Option<Value>> {
        let mut predicates = CompositeKeyResolver::resolve(&self.ty, pk)?;
        let mut statement = self.select(query)?;
        predicates.append(&mut statement.predicates);
        statement.predicates = predicates;
        first_row(dispatch(uow, Statement::Select(statement))?)
    }

    /// First row matching the query
    pub fn select_model_by_column<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        query: &SelectQuery,
    ) -> CrudResult<Option<Value>> {
        let statement = self.select(query)?;
        first_row(dispatch(uow, Statement::Select(statement))?)
    }

    /// All rows matching the query, paged by its limit and offset
    pub fn select_models<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        query: &SelectQuery,
    ) -> CrudResult<Vec<Value>> {
        let statement = self.select(query)?;
        expect_rows(dispatch(uow, Statement::Select(statement))?)
    }

    /// Like `select_models`, sorted
    pub fn select_models_order<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        query: &SelectQuery,
        columns: impl Into<SortColumns>,
        orders: Option<SortOrders>,
    ) -> CrudResult<Vec<Value>> {
        let statement = self.select_order(query, columns, orders)?;
        expect_rows(dispatch(uow, Statement::Select(statement))?)
    }

    // ==================
    // Update
    // ==================

    /// Update the row with primary key `pk`
    pub fn update_model<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        pk: &Value,
        values: &Map<String, Value>,
        options: WriteOptions,
    ) -> CrudResult<u64> {
        let predicates = CompositeKeyResolver::resolve(&self.ty, pk)?;
        self.update_predicates(uow, predicates, self.assignments(values)?, options)
    }

    /// Update rows matching `filters`
    pub fn update_model_by_column<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        filters: &Map<String, Value>,
        values: &Map<String, Value>,
        options: UpdateOptions,
    ) -> CrudResult<u64> {
        let predicates = self.filters.compile(&self.ty, filters)?;
        let values = self.assignments(values)?;
        self.guard_bulk(uow, &predicates, "update", "updated", options.allow_multiple)?;
        self.update_predicates(uow, predicates, values, options.write)
    }

    // ==================
    // Delete
    // ==================

    /// Delete the row with primary key `pk`
    pub fn delete_model<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        pk: &Value,
        options: WriteOptions,
    ) -> CrudResult<u64> {
        let statement = Statement::Delete(DeleteStatement {
            table: self.ty.table().to_string(),
            predicates: CompositeKeyResolver::resolve(&self.ty, pk)?,
        });
        let affected = expect_affected(dispatch(uow, statement)?, "delete")?;
        finish(uow, options)?;
        Ok(affected)
    }

    /// Delete rows matching `filters`, or flag them when logical
    pub fn delete_model_by_column<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        filters: &Map<String, Value>,
        options: DeleteOptions,
    ) -> CrudResult<u64> {
        let flag = if options.logical_deletion {
            let column = &self.filters.config().logical_delete_column;
            Some(FieldResolver::resolve(&self.ty, column)?.clone())
        } else {
            None
        };

        let predicates = self.filters.compile(&self.ty, filters)?;
        self.guard_bulk(uow, &predicates, "delete", "deleted", options.allow_multiple)?;

        match flag {
            Some(field) => {
                let values = vec![Assignment {
                    field,
                    value: Value::Bool(true),
                }];
                self.update_predicates(uow, predicates, values, options.write)
            }
            None => {
                let statement = Statement::Delete(DeleteStatement {
                    table: self.ty.table().to_string(),
                    predicates,
                });
                let affected = expect_affected(dispatch(uow, statement)?, "delete")?;
                finish(uow, options.write)?;
                Ok(affected)
            }
        }
    }

    // ==================
    // Helpers
    // ==================

    fn assignments(&self, payload: &Map<String, Value>) -> CrudResult<Vec<Assignment>> {
        payload
            .iter()
            .map(|(name, value)| {
                Ok(Assignment {
                    field: FieldResolver::resolve(&self.ty, name)?.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }

    fn count_predicates<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        predicates: Vec<PredicateNode>,
        joins: Option<&JoinsSpec>,
    ) -> CrudResult<u64> {
        let joins = match joins {
            Some(spec) => self.planner.build_joins(&self.ty, spec)?,
            None => Vec::new(),
        };
        let statement = Statement::Count(CountStatement {
            table: self.ty.table().to_string(),
            predicates,
            joins,
        });

        match dispatch(uow, statement)? {
            Outcome::Count(count) => Ok(count),
            other => Err(unexpected("count", "count", &other)),
        }
    }

    /// Reject unfiltered bulk writes and, unless allowed, multi-row matches
    fn guard_bulk<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        predicates: &[PredicateNode],
        operation: &'static str,
        participle: &'static str,
        allow_multiple: bool,
    ) -> CrudResult<()> {
        if predicates.is_empty() {
            return Err(CrudError::MissingFilter { operation });
        }
        if !allow_multiple {
            let found = self.count_predicates(uow, predicates.to_vec(), None)?;
            if found > 1 {
                return Err(CrudError::MultipleResults {
                    operation: participle,
                    found,
                });
            }
        }
        Ok(())
    }

    fn update_predicates<U: UnitOfWork + ?Sized>(
        &self,
        uow: &mut U,
        predicates: Vec<PredicateNode>,
        values: Vec<Assignment>,
        options: WriteOptions,
    ) -> CrudResult<u64> {
        let statement = Statement::Update(UpdateStatement {
            table: self.ty.table().to_string(),
            predicates,
            values,
        });
        let affected = expect_affected(dispatch(uow, statement)?, "update")?;
        finish(uow, options)?;
        Ok(affected)
    }
}

fn dispatch<U: UnitOfWork + ?Sized>(uow: &mut U, statement: Statement) -> CrudResult<Outcome> {
    Logger::emit(
        Event::StatementDispatched,
        &[("statement", statement.kind()), ("table", statement.table())],
    );
    Ok(uow.execute(statement)?)
}

fn finish<U: UnitOfWork + ?Sized>(uow: &mut U, options: WriteOptions) -> CrudResult<()> {
    if options.flush {
        uow.flush()?;
    }
    if options.commit {
        uow.commit()?;
    }
    Ok(())
}

fn unexpected(statement: &'static str, expected: &'static str, found: &Outcome) -> CrudError {
    CrudError::UnexpectedOutcome {
        statement,
        expected,
        found: found.kind(),
    }
}

fn expect_rows(outcome: Outcome) -> CrudResult<Vec<Value>> {
    match outcome {
        Outcome::Rows(rows) => Ok(rows),
        other => Err(unexpected("select", "rows", &other)),
    }
}

fn first_row(outcome: Outcome) -> CrudResult<Option<Value>> {
    Ok(expect_rows(outcome)?.into_iter().next())
}

fn expect_affected(outcome: Outcome, statement: &'static str) -> CrudResult<u64> {
    match outcome {
        Outcome::Affected(count) => Ok(count),
        other => Err(unexpected(statement, "affected", &other)),
    }
}
