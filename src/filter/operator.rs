//! # Operator Registry
//!
//! Closed set of filter operators. Tokens map onto two enums:
//!
//! - `CompareOp`: comparison, membership, range, identity and string
//!   operators; these produce boolean predicates directly
//! - `ArithmeticOp`: value-producing operators that only make sense with a
//!   nested condition, e.g. `(price * 2) > 100`
//!
//! Lookup enforces value shape for membership and range operators and the
//! one-level arithmetic nesting rule. Unknown tokens are not errors: they
//! emit a diagnostic naming the field and resolve to `None`.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::predicate::{Condition, Operand};
use crate::errors::{CompileError, CompileResult};
use crate::observability::{Event, Logger};

/// Token introducing a per-field OR mapping, e.g. `name__or`
pub const OR_TOKEN: &str = "or";

/// Where a token is looked up, which decides whether arithmetic is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting<'a> {
    /// Directly under a field key; arithmetic allowed
    TopLevel,
    /// Inside the named operator's mapping; arithmetic rejected
    Inside(&'a str),
}

/// Operator families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFamily {
    Comparison,
    Membership,
    Range,
    Identity,
    String,
    Arithmetic,
}

/// Boolean-producing operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Between,
    Is,
    IsNot,
    IsDistinctFrom,
    IsNotDistinctFrom,
    Like,
    NotLike,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "not_ilike")]
    NotILike,
    #[serde(rename = "startswith")]
    StartsWith,
    #[serde(rename = "endswith")]
    EndsWith,
    Contains,
    Match,
}

impl CompareOp {
    pub const ALL: [CompareOp; 21] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::In,
        CompareOp::NotIn,
        CompareOp::Between,
        CompareOp::Is,
        CompareOp::IsNot,
        CompareOp::IsDistinctFrom,
        CompareOp::IsNotDistinctFrom,
        CompareOp::Like,
        CompareOp::NotLike,
        CompareOp::ILike,
        CompareOp::NotILike,
        CompareOp::StartsWith,
        CompareOp::EndsWith,
        CompareOp::Contains,
        CompareOp::Match,
    ];

    /// Parse a filter token
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "gt" => CompareOp::Gt,
            "ge" => CompareOp::Ge,
            "lt" => CompareOp::Lt,
            "le" => CompareOp::Le,
            "in" => CompareOp::In,
            "not_in" => CompareOp::NotIn,
            "between" => CompareOp::Between,
            "is" => CompareOp::Is,
            "is_not" => CompareOp::IsNot,
            "is_distinct_from" => CompareOp::IsDistinctFrom,
            "is_not_distinct_from" => CompareOp::IsNotDistinctFrom,
            "like" => CompareOp::Like,
            "not_like" => CompareOp::NotLike,
            "ilike" => CompareOp::ILike,
            "not_ilike" => CompareOp::NotILike,
            "startswith" => CompareOp::StartsWith,
            "endswith" => CompareOp::EndsWith,
            "contains" => CompareOp::Contains,
            "match" => CompareOp::Match,
            _ => return None,
        };
        Some(op)
    }

    /// Filter token for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::In => "in",
            CompareOp::NotIn => "not_in",
            CompareOp::Between => "between",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is_not",
            CompareOp::IsDistinctFrom => "is_distinct_from",
            CompareOp::IsNotDistinctFrom => "is_not_distinct_from",
            CompareOp::Like => "like",
            CompareOp::NotLike => "not_like",
            CompareOp::ILike => "ilike",
            CompareOp::NotILike => "not_ilike",
            CompareOp::StartsWith => "startswith",
            CompareOp::EndsWith => "endswith",
            CompareOp::Contains => "contains",
            CompareOp::Match => "match",
        }
    }

    /// Rendering used by `Display` on predicate trees
    pub fn keyword(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
            CompareOp::Between => "BETWEEN",
            CompareOp::Is => "IS",
            CompareOp::IsNot => "IS NOT",
            CompareOp::IsDistinctFrom => "IS DISTINCT FROM",
            CompareOp::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::ILike => "ILIKE",
            CompareOp::NotILike => "NOT ILIKE",
            CompareOp::StartsWith => "STARTS WITH",
            CompareOp::EndsWith => "ENDS WITH",
            CompareOp::Contains => "CONTAINS",
            CompareOp::Match => "MATCH",
        }
    }

    pub fn family(&self) -> OperatorFamily {
        match self {
            CompareOp::Eq
            | CompareOp::Ne
            | CompareOp::Gt
            | CompareOp::Ge
            | CompareOp::Lt
            | CompareOp::Le => OperatorFamily::Comparison,
            CompareOp::In | CompareOp::NotIn => OperatorFamily::Membership,
            CompareOp::Between => OperatorFamily::Range,
            CompareOp::Is
            | CompareOp::IsNot
            | CompareOp::IsDistinctFrom
            | CompareOp::IsNotDistinctFrom => OperatorFamily::Identity,
            CompareOp::Like
            | CompareOp::NotLike
            | CompareOp::ILike
            | CompareOp::NotILike
            | CompareOp::StartsWith
            | CompareOp::EndsWith
            | CompareOp::Contains
            | CompareOp::Match => OperatorFamily::String,
        }
    }

    /// Whether a list value is this operator's whole argument
    pub fn consumes_list(&self) -> bool {
        matches!(
            self.family(),
            OperatorFamily::Membership | OperatorFamily::Range
        )
    }

    /// Shape the raw value into an operand, rejecting bad shapes
    pub fn operand(&self, field: &str, value: &Value) -> CompileResult<Operand> {
        match self.family() {
            OperatorFamily::Membership => match value {
                Value::Array(items) => Ok(Operand::List(items.clone())),
                _ => Err(CompileError::invalid_value(
                    field,
                    self.as_str(),
                    value,
                    "must be a list",
                )),
            },
            OperatorFamily::Range => match value.as_array().map(Vec::as_slice) {
                Some([low, high]) => Ok(Operand::Range(low.clone(), high.clone())),
                _ => Err(CompileError::invalid_value(
                    field,
                    self.as_str(),
                    value,
                    "must be a 2-element list",
                )),
            },
            _ => Ok(Operand::Value(value.clone())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value-producing operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithmeticOp {
    Add,
    RAdd,
    Sub,
    RSub,
    Mul,
    RMul,
    TrueDiv,
    RTrueDiv,
    FloorDiv,
    RFloorDiv,
    Mod,
    RMod,
    /// String concatenation
    Concat,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 13] = [
        ArithmeticOp::Add,
        ArithmeticOp::RAdd,
        ArithmeticOp::Sub,
        ArithmeticOp::RSub,
        ArithmeticOp::Mul,
        ArithmeticOp::RMul,
        ArithmeticOp::TrueDiv,
        ArithmeticOp::RTrueDiv,
        ArithmeticOp::FloorDiv,
        ArithmeticOp::RFloorDiv,
        ArithmeticOp::Mod,
        ArithmeticOp::RMod,
        ArithmeticOp::Concat,
    ];

    /// Parse a filter token
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }

    /// Filter token for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::RAdd => "radd",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::RSub => "rsub",
            ArithmeticOp::Mul => "mul",
            ArithmeticOp::RMul => "rmul",
            ArithmeticOp::TrueDiv => "truediv",
            ArithmeticOp::RTrueDiv => "rtruediv",
            ArithmeticOp::FloorDiv => "floordiv",
            ArithmeticOp::RFloorDiv => "rfloordiv",
            ArithmeticOp::Mod => "mod",
            ArithmeticOp::RMod => "rmod",
            ArithmeticOp::Concat => "concat",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add | ArithmeticOp::RAdd => "+",
            ArithmeticOp::Sub | ArithmeticOp::RSub => "-",
            ArithmeticOp::Mul | ArithmeticOp::RMul => "*",
            ArithmeticOp::TrueDiv | ArithmeticOp::RTrueDiv => "/",
            ArithmeticOp::FloorDiv | ArithmeticOp::RFloorDiv => "//",
            ArithmeticOp::Mod | ArithmeticOp::RMod => "%",
            ArithmeticOp::Concat => "||",
        }
    }

    /// Reflected operators put the operand on the left: `value - column`
    pub fn is_reflected(&self) -> bool {
        matches!(
            self,
            ArithmeticOp::RAdd
                | ArithmeticOp::RSub
                | ArithmeticOp::RMul
                | ArithmeticOp::RTrueDiv
                | ArithmeticOp::RFloorDiv
                | ArithmeticOp::RMod
        )
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateBuilder {
    /// Ready to bind to a field
    Compare(Condition),
    /// Needs a nested condition before it becomes a predicate
    Arithmetic { op: ArithmeticOp, operand: Value },
}

impl PredicateBuilder {
    /// The condition of a comparison builder
    pub fn into_condition(self) -> Option<Condition> {
        match self {
            PredicateBuilder::Compare(condition) => Some(condition),
            PredicateBuilder::Arithmetic { .. } => None,
        }
    }
}

/// Dispatch from operator token to predicate builder
pub struct OperatorRegistry;

impl OperatorRegistry {
    /// Resolve an operator token against its value on `field`.
    ///
    /// Returns `Ok(None)` for unknown tokens after emitting a diagnostic.
    /// Inside another operator's mapping an arithmetic token fails with
    /// `NestedArithmeticNotAllowed`.
    pub fn lookup(
        field: &str,
        token: &str,
        value: &Value,
        nesting: Nesting<'_>,
    ) -> CompileResult<Option<PredicateBuilder>> {
        if let Some(op) = CompareOp::from_token(token) {
            let operand = op.operand(field, value)?;
            return Ok(Some(PredicateBuilder::Compare(Condition { op, operand })));
        }

        if let Some(op) = ArithmeticOp::from_token(token) {
            if let Nesting::Inside(within) = nesting {
                return Err(CompileError::NestedArithmeticNotAllowed {
                    field: field.to_string(),
                    operator: token.to_string(),
                    within: within.to_string(),
                });
            }
            return Ok(Some(PredicateBuilder::Arithmetic {
                op,
                operand: value.clone(),
            }));
        }

        Logger::emit(Event::UnknownOperator, &[("field", field), ("operator", token)]);
        Ok(None)
    }

    /// Lookup inside `within`'s mapping, yielding a bare condition
    pub fn lookup_condition(
        field: &str,
        within: &str,
        token: &str,
        value: &Value,
    ) -> CompileResult<Option<Condition>> {
        Ok(Self::lookup(field, token, value, Nesting::Inside(within))?
            .and_then(PredicateBuilder::into_condition))
    }

    /// Checks whether a token names an arithmetic operator
    pub fn is_arithmetic(token: &str) -> bool {
        ArithmeticOp::from_token(token).is_some()
    }

    /// Whether a list value is applied one element at a time.
    /// Unknown tokens are not expanded, so they are skipped once.
    pub fn expands_list(token: &str) -> bool {
        CompareOp::from_token(token).map_or(false, |op| !op.consumes_list())
    }

    /// Every supported token
    pub fn tokens() -> impl Iterator<Item = &'static str> {
        CompareOp::ALL
            .into_iter()
            .map(|op| op.as_str())
            .chain(ArithmeticOp::ALL.into_iter().map(|op| op.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokens_round_trip() {
        for token in OperatorRegistry::tokens() {
            let known = CompareOp::from_token(token)
                .map(|op| op.as_str())
                .or_else(|| ArithmeticOp::from_token(token).map(|op| op.as_str()));
            assert_eq!(known, Some(token));
        }
        assert_eq!(OperatorRegistry::tokens().count(), 34);
    }

    #[test]
    fn test_membership_requires_list() {
        for token in ["in", "not_in"] {
            let result = OperatorRegistry::lookup("tags", token, &json!("bad"), Nesting::TopLevel);
            assert_eq!(
                result,
                Err(CompileError::invalid_value(
                    "tags",
                    token,
                    &json!("bad"),
                    "must be a list"
                ))
            );
        }

        let builder = OperatorRegistry::lookup("tags", "in", &json!([1, 2, 3]), Nesting::TopLevel)
            .unwrap()
            .unwrap();
        assert_eq!(
            builder,
            PredicateBuilder::Compare(Condition {
                op: CompareOp::In,
                operand: Operand::List(vec![json!(1), json!(2), json!(3)]),
            })
        );
    }

    #[test]
    fn test_between_requires_two_elements() {
        for bad in [json!(5), json!([1]), json!([1, 2, 3])] {
            let result = OperatorRegistry::lookup("age", "between", &bad, Nesting::TopLevel);
            assert!(matches!(
                result,
                Err(CompileError::InvalidOperatorValue { ref field, .. }) if field == "age"
            ));
        }

        let condition = OperatorRegistry::lookup_condition("age", "add", "between", &json!([1, 10]))
            .unwrap()
            .unwrap();
        assert_eq!(condition.operand, Operand::Range(json!(1), json!(10)));
    }

    #[test]
    fn test_unknown_token_is_lenient() {
        let top = Nesting::TopLevel;
        assert_eq!(OperatorRegistry::lookup("name", "bogus", &json!(1), top), Ok(None));
        assert_eq!(OperatorRegistry::lookup("name", OR_TOKEN, &json!({}), top), Ok(None));
    }

    #[test]
    fn test_arithmetic_gated() {
        let builder = OperatorRegistry::lookup("price", "mul", &json!(2), Nesting::TopLevel);
        assert_eq!(
            builder,
            Ok(Some(PredicateBuilder::Arithmetic {
                op: ArithmeticOp::Mul,
                operand: json!(2),
            }))
        );

        assert_eq!(
            OperatorRegistry::lookup("price", "mul", &json!(2), Nesting::Inside("add")),
            Err(CompileError::NestedArithmeticNotAllowed {
                field: "price".into(),
                operator: "mul".into(),
                within: "add".into(),
            })
        );
    }

    #[test]
    fn test_families() {
        assert!(CompareOp::In.consumes_list());
        assert!(CompareOp::Between.consumes_list());
        assert!(!CompareOp::Like.consumes_list());
        assert!(OperatorRegistry::expands_list("lt"));
        assert!(!OperatorRegistry::expands_list("in"));
        assert!(!OperatorRegistry::expands_list("bogus"));
        assert_eq!(CompareOp::IsDistinctFrom.family(), OperatorFamily::Identity);
        assert!(OperatorRegistry::is_arithmetic("rfloordiv"));
        assert!(!OperatorRegistry::is_arithmetic("gt"));
        assert!(ArithmeticOp::RMod.is_reflected());
        assert!(!ArithmeticOp::Concat.is_reflected());
    }

    #[test]
    fn test_identity_accepts_null() {
        let condition = OperatorRegistry::lookup_condition("removed", OR_TOKEN, "is", &Value::Null)
            .unwrap()
            .unwrap();
        assert_eq!(condition.op, CompareOp::Is);
        assert_eq!(condition.operand, Operand::Value(Value::Null));
    }
}
