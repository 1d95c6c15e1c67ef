//! Declarative statements handed to a unit of work
//!
//! Statements are plain values built from compiled predicates and
//! directives. Nothing here knows how to run them.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::filter::PredicateNode;
use crate::planner::{JoinDirective, LoadDirective, SortSpec};
use crate::schema::FieldDescriptor;

/// `field = value` in an insert or update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub field: FieldDescriptor,
    pub value: Value,
}

/// Insert one or more rows
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub rows: Vec<Vec<Assignment>>,
}

/// Fetch rows
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub table: String,
    /// Conjunctive
    pub predicates: Vec<PredicateNode>,
    /// Applied in order
    pub joins: Vec<JoinDirective>,
    pub loads: Vec<LoadDirective>,
    pub order_by: SortSpec,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            joins: Vec::new(),
            loads: Vec::new(),
            order_by: SortSpec::default(),
            limit: None,
            offset: None,
        }
    }
}

/// Count matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct CountStatement {
    pub table: String,
    pub predicates: Vec<PredicateNode>,
    pub joins: Vec<JoinDirective>,
}

/// Set values on matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub predicates: Vec<PredicateNode>,
    pub values: Vec<Assignment>,
}

/// Remove matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub predicates: Vec<PredicateNode>,
}

/// Any statement a unit of work can execute
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    Select(SelectStatement),
    Count(CountStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "insert",
            Statement::Select(_) => "select",
            Statement::Count(_) => "count",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::Insert(s) => &s.table,
            Statement::Select(s) => &s.table,
            Statement::Count(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    /// Conjunctive predicates; empty for inserts
    pub fn predicates(&self) -> &[PredicateNode] {
        match self {
            Statement::Insert(_) => &[],
            Statement::Select(s) => s.predicates.as_slice(),
            Statement::Count(s) => s.predicates.as_slice(),
            Statement::Update(s) => s.predicates.as_slice(),
            Statement::Delete(s) => s.predicates.as_slice(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind().to_uppercase(), self.table())?;
        for (idx, predicate) in self.predicates().iter().enumerate() {
            let keyword = if idx == 0 { "WHERE" } else { "AND" };
            write!(f, " {} {}", keyword, predicate)?;
        }
        Ok(())
    }
}

/// What a unit of work returns for a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Select results
    Rows(Vec<Value>),
    /// Count result
    Count(u64),
    /// Rows touched by insert, update or delete
    Affected(u64),
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Rows(_) => "rows",
            Outcome::Count(_) => "count",
            Outcome::Affected(_) => "affected",
        }
    }
}
