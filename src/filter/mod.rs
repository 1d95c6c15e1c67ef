//! Filter compilation for crudplus
//!
//! A filter map is a flat JSON object of `key -> value` descriptors. Keys
//! are parsed into `FilterKey`s, operators dispatched through the closed
//! `OperatorRegistry`, and results assembled bottom-up into immutable
//! `PredicateNode` trees.
//!
//! Compilation is pure and deterministic: the same map against the same
//! row type always yields the same trees.

mod compiler;
mod key;
mod operator;
mod predicate;

pub use compiler::{CompiledFilter, FilterCompiler, SkippedOperator};
pub use key::FilterKey;
pub use operator::{
    ArithmeticOp, CompareOp, Nesting, OperatorFamily, OperatorRegistry, PredicateBuilder,
    OR_TOKEN,
};
pub use predicate::{Condition, Operand, PredicateNode};
