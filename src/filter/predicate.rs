//! # Predicate Tree
//!
//! Output of filter compilation. Leaves are comparisons (optionally over an
//! arithmetic sub-expression); inner nodes are `And`/`Or` combinators.
//! Trees are built bottom-up and never mutated afterwards; the caller that
//! requested compilation owns them.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::operator::{ArithmeticOp, CompareOp};
use crate::schema::{ColumnHandle, FieldDescriptor};

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    /// A single value
    Value(Value),
    /// Membership list (`in`, `not_in`)
    List(Vec<Value>),
    /// Inclusive bounds (`between`)
    Range(Value, Value),
    /// Another column (join conditions)
    Column(ColumnHandle),
}

/// An operator applied to an operand, not yet bound to a field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub op: CompareOp,
    pub operand: Operand,
}

/// A node of the predicate tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum PredicateNode {
    /// `field <op> operand`
    Comparison {
        field: FieldDescriptor,
        op: CompareOp,
        operand: Operand,
    },
    /// `(field <arith> operand) <condition>`
    Arithmetic {
        field: FieldDescriptor,
        op: ArithmeticOp,
        operand: Value,
        condition: Condition,
    },
    /// Any child holds
    Or { children: Vec<PredicateNode> },
    /// Every child holds
    And { children: Vec<PredicateNode> },
}

impl PredicateNode {
    /// `field = value`
    pub fn eq(field: &FieldDescriptor, value: Value) -> Self {
        PredicateNode::Comparison {
            field: field.clone(),
            op: CompareOp::Eq,
            operand: Operand::Value(value),
        }
    }

    /// Bind a condition to a field
    pub fn comparison(field: &FieldDescriptor, condition: Condition) -> Self {
        PredicateNode::Comparison {
            field: field.clone(),
            op: condition.op,
            operand: condition.operand,
        }
    }

    /// Combine under `Or`; `None` when there is nothing to combine
    pub fn any(children: Vec<PredicateNode>) -> Option<Self> {
        if children.is_empty() {
            None
        } else {
            Some(PredicateNode::Or { children })
        }
    }

    /// Combine under `And`; `None` when there is nothing to combine
    pub fn all(children: Vec<PredicateNode>) -> Option<Self> {
        if children.is_empty() {
            None
        } else {
            Some(PredicateNode::And { children })
        }
    }

    /// Field of a leaf node
    pub fn field(&self) -> Option<&FieldDescriptor> {
        match self {
            PredicateNode::Comparison { field, .. } | PredicateNode::Arithmetic { field, .. } => {
                Some(field)
            }
            PredicateNode::Or { .. } | PredicateNode::And { .. } => None,
        }
    }

    /// Children of a combinator node
    pub fn children(&self) -> &[PredicateNode] {
        match self {
            PredicateNode::Or { children } | PredicateNode::And { children } => children.as_slice(),
            PredicateNode::Comparison { .. } | PredicateNode::Arithmetic { .. } => &[],
        }
    }

    /// Number of leaves under this node
    pub fn leaf_count(&self) -> usize {
        match self {
            PredicateNode::Comparison { .. } | PredicateNode::Arithmetic { .. } => 1,
            PredicateNode::Or { children } | PredicateNode::And { children } => {
                children.iter().map(PredicateNode::leaf_count).sum()
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(value) => write!(f, "{}", value),
            Operand::List(values) => {
                f.write_str("(")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str(")")
            }
            Operand::Range(low, high) => write!(f, "{} AND {}", low, high),
            Operand::Column(column) => write!(f, "{}", column.qualified()),
        }
    }
}

impl fmt::Display for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateNode::Comparison { field, op, operand } => write!(
                f,
                "{} {} {}",
                field.column().qualified(),
                op.keyword(),
                operand
            ),
            PredicateNode::Arithmetic {
                field,
                op,
                operand,
                condition,
            } => {
                let column = field.column().qualified();
                if op.is_reflected() {
                    write!(f, "({} {} {})", operand, op.symbol(), column)?;
                } else {
                    write!(f, "({} {} {})", column, op.symbol(), operand)?;
                }
                write!(f, " {} {}", condition.op.keyword(), condition.operand)
            }
            PredicateNode::Or { children } => write_joined(f, children, " OR "),
            PredicateNode::And { children } => write_joined(f, children, " AND "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[PredicateNode], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}
