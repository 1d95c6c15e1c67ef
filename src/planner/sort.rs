//! Sort compilation
//!
//! Pairs column names with directions. Columns and orders each arrive as a
//! scalar or a list; a scalar column is a one-element list, a scalar order
//! applies to every column, and absent (or empty) orders mean ascending.
//!
//! Validation order: orders without columns, arity, direction tokens, then
//! field resolution.

use std::fmt;

use serde::Serialize;

use crate::errors::{CompileError, CompileResult};
use crate::schema::{FieldDescriptor, FieldResolver, RowTypeDescriptor};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction token; only exact `asc` / `desc` are accepted
    pub fn from_token(token: &str) -> CompileResult<Self> {
        match token {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(CompileError::InvalidSortDirection(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort columns: one name or a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortColumns {
    One(String),
    Many(Vec<String>),
}

/// Sort orders: one token for every column, or one per column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrders {
    One(String),
    Many(Vec<String>),
}

macro_rules! scalar_or_list {
    ($ty:ident) => {
        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                $ty::One(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                $ty::One(value)
            }
        }

        impl<S: Into<String>> From<Vec<S>> for $ty {
            fn from(values: Vec<S>) -> Self {
                $ty::Many(values.into_iter().map(Into::into).collect())
            }
        }

        impl<S: Into<String>, const N: usize> From<[S; N]> for $ty {
            fn from(values: [S; N]) -> Self {
                $ty::Many(values.into_iter().map(Into::into).collect())
            }
        }
    };
}

scalar_or_list!(SortColumns);
scalar_or_list!(SortOrders);

impl SortOrders {
    fn is_empty(&self) -> bool {
        match self {
            SortOrders::One(_) => false,
            SortOrders::Many(tokens) => tokens.is_empty(),
        }
    }
}

/// One resolved sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: FieldDescriptor,
    pub direction: SortDirection,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.column().qualified(), self.direction)
    }
}

/// Ordered sort keys; empty means no ordering
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Validates and pairs sort columns with directions
pub struct SortCompiler;

impl SortCompiler {
    /// Compile columns and optional orders into a `SortSpec`
    pub fn compile(
        ty: &RowTypeDescriptor,
        columns: impl Into<SortColumns>,
        orders: Option<SortOrders>,
    ) -> CompileResult<SortSpec> {
        let columns = match columns.into() {
            SortColumns::One(column) => vec![column],
            SortColumns::Many(columns) => columns,
        };
        let orders = orders.filter(|orders| !orders.is_empty());

        if columns.is_empty() {
            return match orders {
                Some(_) => Err(CompileError::OrdersWithoutColumns),
                None => Ok(SortSpec::default()),
            };
        }

        let directions = match orders {
            None => vec![SortDirection::Asc; columns.len()],
            Some(SortOrders::One(token)) => {
                vec![SortDirection::from_token(&token)?; columns.len()]
            }
            Some(SortOrders::Many(tokens)) => {
                if tokens.len() != columns.len() {
                    return Err(CompileError::SortArityMismatch {
                        columns: columns.len(),
                        orders: tokens.len(),
                    });
                }
                tokens
                    .iter()
                    .map(|token| SortDirection::from_token(token))
                    .collect::<CompileResult<Vec<_>>>()?
            }
        };

        let keys = columns
            .iter()
            .zip(directions)
            .map(|(column, direction)| {
                Ok(SortKey {
                    field: FieldResolver::resolve(ty, column)?.clone(),
                    direction,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        Ok(SortSpec { keys })
    }
}
