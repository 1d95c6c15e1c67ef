//! # Filter Compiler
//!
//! Turns a flat filter mapping into a list of predicate nodes. The list is
//! a conjunction: callers AND the nodes together.
//!
//! Key forms:
//!
//! - `field`: equality
//! - `field__op`: single operator, `between` takes `[low, high]`
//! - `field__or`: `{op: value, ...}` alternatives on one field
//! - `field__<arith>`: `{"value": v, "condition": {op: value}}`
//! - `__or__`: `{key: value, ...}` alternatives across fields
//!
//! Field resolution happens before operator lookup, so a bad field name
//! always fails even when the operator would have been skipped.

use serde::Serialize;
use serde_json::{Map, Value};

use super::key::FilterKey;
use super::operator::{Nesting, OperatorRegistry, PredicateBuilder, OR_TOKEN};
use super::predicate::PredicateNode;
use crate::config::CompilerConfig;
use crate::errors::{CompileError, CompileResult};
use crate::observability::{Event, Logger};
use crate::schema::{FieldDescriptor, FieldResolver, RowTypeDescriptor};

const ARITHMETIC_VALUE_KEY: &str = "value";
const ARITHMETIC_CONDITION_KEY: &str = "condition";

/// An operator that was skipped during compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedOperator {
    pub field: String,
    pub operator: String,
}

/// Compilation output with diagnostics
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFilter {
    /// Conjunctive predicate list
    pub predicates: Vec<PredicateNode>,
    /// Unknown operators, in encounter order
    pub skipped: Vec<SkippedOperator>,
}

/// Compiles filter mappings against a row type
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    config: CompilerConfig,
}

impl FilterCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a filter mapping into a conjunctive predicate list
    pub fn compile(
        &self,
        ty: &RowTypeDescriptor,
        filters: &Map<String, Value>,
    ) -> CompileResult<Vec<PredicateNode>> {
        Ok(self.compile_report(ty, filters)?.predicates)
    }

    /// Like `compile`, but also reports skipped operators
    pub fn compile_report(
        &self,
        ty: &RowTypeDescriptor,
        filters: &Map<String, Value>,
    ) -> CompileResult<CompiledFilter> {
        let mut pass = Pass {
            ty,
            config: &self.config,
            skipped: Vec::new(),
        };

        let mut predicates = Vec::with_capacity(filters.len());
        for (key, value) in filters {
            if let Some(node) = pass.top_level(key, value)? {
                predicates.push(node);
            }
        }

        Ok(CompiledFilter {
            predicates,
            skipped: pass.skipped,
        })
    }
}

/// State of one compilation
struct Pass<'a> {
    ty: &'a RowTypeDescriptor,
    config: &'a CompilerConfig,
    skipped: Vec<SkippedOperator>,
}

impl<'a> Pass<'a> {
    fn parse<'k>(&self, key: &'k str) -> FilterKey<'k> {
        FilterKey::parse(key, &self.config.delimiter, &self.config.or_group_marker)
    }

    fn top_level(&mut self, key: &str, value: &Value) -> CompileResult<Option<PredicateNode>> {
        match self.parse(key) {
            FilterKey::OrGroup => self.or_group(value),
            FilterKey::Field(name) => {
                let field = FieldResolver::resolve(self.ty, name)?;
                Ok(Some(PredicateNode::eq(field, value.clone())))
            }
            FilterKey::FieldOp { field, operator } => {
                let field = FieldResolver::resolve(self.ty, field)?;
                if operator == OR_TOKEN {
                    let alternatives = self.field_or(field, value)?;
                    return Ok(self.combine_or(alternatives, field.name()));
                }
                if OperatorRegistry::is_arithmetic(operator) {
                    return self.arithmetic(field, operator, value);
                }
                self.comparison(field, operator, value)
            }
        }
    }

    /// `field__op: value`
    fn comparison(
        &mut self,
        field: &FieldDescriptor,
        operator: &str,
        value: &Value,
    ) -> CompileResult<Option<PredicateNode>> {
        match OperatorRegistry::lookup(field.name(), operator, value, Nesting::TopLevel)? {
            Some(PredicateBuilder::Compare(condition)) => {
                Ok(Some(PredicateNode::comparison(field, condition)))
            }
            Some(PredicateBuilder::Arithmetic { .. }) | None => {
                self.skip(field, operator);
                Ok(None)
            }
        }
    }

    /// `field__or: {op: value, ...}`, arithmetic disabled
    fn field_or(
        &mut self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> CompileResult<Vec<PredicateNode>> {
        let alternatives = value.as_object().ok_or_else(|| {
            CompileError::invalid_value(field.name(), OR_TOKEN, value, "must be a mapping")
        })?;

        let mut nodes = Vec::with_capacity(alternatives.len());
        for (operator, operand) in alternatives {
            match OperatorRegistry::lookup_condition(field.name(), OR_TOKEN, operator, operand)? {
                Some(condition) => nodes.push(PredicateNode::comparison(field, condition)),
                None => self.skip(field, operator),
            }
        }
        Ok(nodes)
    }

    /// `field__<arith>: {"value": v, "condition": {op: value, ...}}`
    fn arithmetic(
        &mut self,
        field: &FieldDescriptor,
        operator: &str,
        value: &Value,
    ) -> CompileResult<Option<PredicateNode>> {
        let (operand, condition) = split_arithmetic(field, operator, value)?;

        let builder = OperatorRegistry::lookup(field.name(), operator, operand, Nesting::TopLevel)?;
        let op = match builder {
            Some(PredicateBuilder::Arithmetic { op, .. }) => op,
            Some(PredicateBuilder::Compare(_)) | None => {
                self.skip(field, operator);
                return Ok(None);
            }
        };

        let mut nodes = Vec::with_capacity(condition.len());
        for (cond_op, cond_value) in condition {
            match OperatorRegistry::lookup_condition(field.name(), operator, cond_op, cond_value)? {
                Some(condition) => nodes.push(PredicateNode::Arithmetic {
                    field: field.clone(),
                    op,
                    operand: operand.clone(),
                    condition,
                }),
                None => self.skip(field, cond_op),
            }
        }

        let node = PredicateNode::all(nodes);
        if node.is_none() {
            Logger::emit(
                Event::EmptyArithmeticDropped,
                &[("field", field.name()), ("operator", operator)],
            );
        }
        Ok(node)
    }

    /// `__or__: {key: value, ...}`
    fn or_group(&mut self, value: &Value) -> CompileResult<Option<PredicateNode>> {
        let group = value
            .as_object()
            .ok_or_else(|| CompileError::InvalidOrGroupValue(value.clone()))?;

        let mut alternatives = Vec::new();
        for (key, inner) in group {
            match self.parse(key) {
                FilterKey::OrGroup => {
                    return Err(CompileError::field_not_found(self.ty.name(), key));
                }
                FilterKey::Field(name) => {
                    let field = FieldResolver::resolve(self.ty, name)?;
                    match inner {
                        Value::Array(items) => {
                            alternatives.extend(
                                items.iter().map(|item| PredicateNode::eq(field, item.clone())),
                            );
                        }
                        _ => alternatives.push(PredicateNode::eq(field, inner.clone())),
                    }
                }
                FilterKey::FieldOp { field, operator } => {
                    let field = FieldResolver::resolve(self.ty, field)?;
                    if operator == OR_TOKEN {
                        alternatives.extend(self.field_or(field, inner)?);
                    } else if OperatorRegistry::is_arithmetic(operator) {
                        alternatives.extend(self.arithmetic(field, operator, inner)?);
                    } else {
                        self.repeated(field, operator, inner, &mut alternatives)?;
                    }
                }
            }
        }

        Ok(self.combine_or(alternatives, &self.config.or_group_marker))
    }

    /// One application per list element, unless the operator takes the list
    /// or is unknown
    fn repeated(
        &mut self,
        field: &FieldDescriptor,
        operator: &str,
        value: &Value,
        out: &mut Vec<PredicateNode>,
    ) -> CompileResult<()> {
        match value {
            Value::Array(items) if OperatorRegistry::expands_list(operator) => {
                for item in items {
                    out.extend(self.comparison(field, operator, item)?);
                }
                Ok(())
            }
            _ => {
                out.extend(self.comparison(field, operator, value)?);
                Ok(())
            }
        }
    }

    fn combine_or(&self, alternatives: Vec<PredicateNode>, origin: &str) -> Option<PredicateNode> {
        let node = PredicateNode::any(alternatives);
        if node.is_none() {
            Logger::emit(Event::EmptyOrGroupDropped, &[("key", origin)]);
        }
        node
    }

    fn skip(&mut self, field: &FieldDescriptor, operator: &str) {
        self.skipped.push(SkippedOperator {
            field: field.name().to_string(),
            operator: operator.to_string(),
        });
    }
}

/// Split an arithmetic value into its operand and condition mapping
fn split_arithmetic<'v>(
    field: &FieldDescriptor,
    operator: &str,
    value: &'v Value,
) -> CompileResult<(&'v Value, &'v Map<String, Value>)> {
    const REASON: &str = "must be a mapping with `value` and `condition` keys";
    let malformed = || CompileError::invalid_value(field.name(), operator, value, REASON);

    let mapping = value
        .as_object()
        .filter(|m| m.len() == 2)
        .ok_or_else(malformed)?;

    match (
        mapping.get(ARITHMETIC_VALUE_KEY),
        mapping.get(ARITHMETIC_CONDITION_KEY),
    ) {
        (Some(operand), Some(Value::Object(condition))) => Ok((operand, condition)),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ArithmeticOp, CompareOp, Operand};
    use serde_json::json;
    use tracing_test::traced_test;

    fn items() -> RowTypeDescriptor {
        RowTypeDescriptor::builder("item", "items")
            .key_field("id")
            .field("name")
            .field("price")
            .relationship("tags", "tag")
            .build()
            .unwrap()
    }

    fn compile(filters: Value) -> CompileResult<Vec<PredicateNode>> {
        let map = filters.as_object().cloned().unwrap_or_default();
        FilterCompiler::default().compile(&items(), &map)
    }

    #[test]
    fn test_equality_without_operator() {
        let nodes = compile(json!({"name": "abc"})).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].to_string(), "items.name = \"abc\"");
    }

    #[test]
    fn test_operator_suffix() {
        let nodes = compile(json!({"price__ge": 10, "name__like": "a%"})).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(
            &nodes[0],
            PredicateNode::Comparison { op: CompareOp::Ge, .. }
        ));
        assert!(matches!(
            &nodes[1],
            PredicateNode::Comparison { op: CompareOp::Like, .. }
        ));
    }

    #[test]
    fn test_unknown_operator_skipped_and_reported() {
        let ty = items();
        let map = json!({"name__bogus": 1, "id": 3})
            .as_object()
            .cloned()
            .unwrap();
        let report = FilterCompiler::default().compile_report(&ty, &map).unwrap();

        assert_eq!(report.predicates.len(), 1);
        assert_eq!(
            report.skipped,
            vec![SkippedOperator {
                field: "name".into(),
                operator: "bogus".into(),
            }]
        );
    }

    #[test]
    fn test_bad_operator_value_names_its_field() {
        let err = compile(json!({"name": "a", "price__in": "bad", "id__in": "x"})).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidOperatorValue {
                field: "price".into(),
                operator: "in".into(),
                value: json!("bad"),
                reason: "must be a list",
            }
        );
        assert!(err.to_string().contains("<in> filter on price"));

        let err = compile(json!({"id__between": [1]})).unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidOperatorValue { ref field, .. } if field == "id"
        ));
    }

    #[test]
    fn test_malformed_shapes_name_their_field() {
        let err = compile(json!({"name__or": "a"})).unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidOperatorValue { ref field, ref operator, .. }
                if field == "name" && operator == "or"
        ));

        let err = compile(json!({"price__add": 5})).unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidOperatorValue { ref field, ref operator, .. }
                if field == "price" && operator == "add"
        ));

        let err = compile(json!({
            "id__mul": {"value": 2, "condition": {"in": 4}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidOperatorValue { ref field, ref operator, .. }
                if field == "id" && operator == "in"
        ));
    }

    #[test]
    #[traced_test]
    fn test_unknown_operator_logs_field() {
        let ty = items();
        let map = json!({"price__bogus": 1}).as_object().cloned().unwrap();
        FilterCompiler::default().compile(&ty, &map).unwrap();

        assert!(logs_contain("FILTER_UNKNOWN_OPERATOR"));
        assert!(logs_contain("field=\"price\" operator=\"bogus\""));
    }

    #[test]
    #[traced_test]
    fn test_unknown_operator_with_list_in_or_group_skipped_once() {
        let ty = items();
        let map = json!({"__or__": {"name__bogus": ["a", "b"], "id": 1}})
            .as_object()
            .cloned()
            .unwrap();
        let report = FilterCompiler::default().compile_report(&ty, &map).unwrap();

        assert_eq!(
            report.skipped,
            vec![SkippedOperator {
                field: "name".into(),
                operator: "bogus".into(),
            }]
        );
        assert_eq!(report.predicates.len(), 1);
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("FILTER_UNKNOWN_OPERATOR"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one unknown-operator warning, got {}", n)),
            }
        });
    }

    #[test]
    fn test_field_resolution_before_operator() {
        let err = compile(json!({"missing__bogus": 1})).unwrap_err();
        assert_eq!(err.code(), "FIELD_NOT_FOUND");
    }

    #[test]
    fn test_relationship_rejected_as_filter_field() {
        let err = compile(json!({"tags": 1})).unwrap_err();
        assert_eq!(err.code(), "INVALID_FIELD_KIND");
    }

    #[test]
    fn test_field_or() {
        let nodes = compile(json!({"name__or": {"startswith": "a", "endswith": "z"}})).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], PredicateNode::Or { children } if children.len() == 2));
    }

    #[test]
    fn test_field_or_requires_mapping() {
        let err = compile(json!({"name__or": ["a", "b"]})).unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATOR_VALUE");
    }

    #[test]
    fn test_field_or_rejects_arithmetic() {
        let err = compile(json!({"price__or": {"mul": 2}})).unwrap_err();
        assert_eq!(
            err,
            CompileError::NestedArithmeticNotAllowed {
                field: "price".into(),
                operator: "mul".into(),
                within: "or".into(),
            }
        );
    }

    #[test]
    fn test_field_or_all_unknown_dropped() {
        let nodes = compile(json!({"name__or": {"or": {"eq": 1}}})).unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_arithmetic_filter() {
        let nodes = compile(json!({
            "price__mul": {"value": 2, "condition": {"gt": 100, "lt": 500}}
        }))
        .unwrap();

        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            PredicateNode::And { children } => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0].to_string(), "(items.price * 2) > 100");
                assert!(matches!(
                    &children[1],
                    PredicateNode::Arithmetic { op: ArithmeticOp::Mul, .. }
                ));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_between_condition() {
        let nodes = compile(json!({
            "id__radd": {"value": 1, "condition": {"between": [5, 10]}}
        }))
        .unwrap();
        assert_eq!(nodes[0].to_string(), "((1 + items.id) BETWEEN 5 AND 10)");
    }

    #[test]
    fn test_arithmetic_nested_arithmetic_rejected() {
        let err = compile(json!({
            "price__add": {"value": 1, "condition": {"mul": 2}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::NestedArithmeticNotAllowed {
                field: "price".into(),
                operator: "mul".into(),
                within: "add".into(),
            }
        );
    }

    #[test]
    fn test_arithmetic_empty_condition_dropped() {
        let nodes = compile(json!({
            "price__sub": {"value": 1, "condition": {}}
        }))
        .unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_arithmetic_shape_enforced() {
        for bad in [
            json!({"price__sub": 5}),
            json!({"price__sub": {"value": 1}}),
            json!({"price__sub": {"value": 1, "condition": 3}}),
            json!({"price__sub": {"value": 1, "condition": {}, "extra": 0}}),
        ] {
            let err = compile(bad).unwrap_err();
            assert_eq!(err.code(), "INVALID_OPERATOR_VALUE");
        }
    }

    #[test]
    fn test_concat_is_arithmetic() {
        let nodes = compile(json!({
            "name__concat": {"value": "_x", "condition": {"eq": "a_x"}}
        }))
        .unwrap();
        assert_eq!(nodes[0].to_string(), "((items.name || \"_x\") = \"a_x\")");
    }

    #[test]
    fn test_or_group_list_semantics() {
        let nodes = compile(json!({
            "__or__": {"name": ["a", "b"], "id__in": [1, 2], "price__lt": [5, 7]}
        }))
        .unwrap();

        assert_eq!(nodes.len(), 1);
        let children = nodes[0].children();
        assert_eq!(children.len(), 5);
        assert!(matches!(
            &children[2],
            PredicateNode::Comparison { op: CompareOp::In, operand: Operand::List(items), .. }
                if items.len() == 2
        ));
    }

    #[test]
    fn test_or_group_flattens_field_or() {
        let nodes = compile(json!({
            "__or__": {"name__or": {"eq": "a", "like": "b%"}, "id": 1}
        }))
        .unwrap();
        assert_eq!(nodes[0].children().len(), 3);
    }

    #[test]
    fn test_or_group_requires_mapping() {
        let err = compile(json!({"__or__": [1, 2]})).unwrap_err();
        assert_eq!(err, CompileError::InvalidOrGroupValue(json!([1, 2])));
    }

    #[test]
    fn test_empty_or_group_dropped() {
        assert!(compile(json!({"__or__": {}})).unwrap().is_empty());
        assert!(compile(json!({"__or__": {"name__nope": 1}})).unwrap().is_empty());
    }

    #[test]
    fn test_nested_group_marker_rejected() {
        let err = compile(json!({"__or__": {"__or__": {"id": 1}}})).unwrap_err();
        assert_eq!(err.code(), "FIELD_NOT_FOUND");
    }

    #[test]
    fn test_custom_delimiter() {
        let config = CompilerConfig {
            delimiter: ".".into(),
            or_group_marker: "$or".into(),
            ..CompilerConfig::default()
        };
        let map = json!({"price.gt": 1, "$or": {"id": [1, 2]}})
            .as_object()
            .cloned()
            .unwrap();
        let nodes = FilterCompiler::new(config).compile(&items(), &map).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let filters = json!({
            "name__in": ["a", "b"],
            "__or__": {"id__gt": 3, "price": [1, 2]},
            "price__mod": {"value": 2, "condition": {"eq": 0}}
        });
        assert_eq!(compile(filters.clone()).unwrap(), compile(filters).unwrap());
    }
}
