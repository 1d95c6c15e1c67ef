//! Primary key resolution
//!
//! A single-column key takes the value as-is (even an array). A composite
//! key takes an array zipped positionally onto the key columns; its length
//! must equal the key arity exactly.

use serde_json::Value;

use crate::errors::{CompileError, CompileResult};
use crate::filter::PredicateNode;
use crate::schema::RowTypeDescriptor;

/// Maps primary key values onto equality predicates
pub struct CompositeKeyResolver;

impl CompositeKeyResolver {
    /// One equality per key column, in key order
    pub fn resolve(ty: &RowTypeDescriptor, pk: &Value) -> CompileResult<Vec<PredicateNode>> {
        let arity = ty.primary_key_arity();

        if arity == 1 {
            return Ok(ty
                .primary_key()
                .map(|field| PredicateNode::eq(field, pk.clone()))
                .collect());
        }

        let components = match pk {
            Value::Array(components) => components.as_slice(),
            // A scalar is a one-element key
            _ => std::slice::from_ref(pk),
        };

        if components.len() != arity {
            return Err(CompileError::CompositeKeyArityError {
                expected: arity,
                received: components.len(),
            });
        }

        Ok(ty
            .primary_key()
            .zip(components)
            .map(|(field, value)| PredicateNode::eq(field, value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enrollment() -> RowTypeDescriptor {
        RowTypeDescriptor::builder("enrollment", "enrollments")
            .key_field("student_id")
            .key_field("course_id")
            .field("grade")
            .build()
            .unwrap()
    }

    #[test]
    fn test_single_key_is_scalar() {
        let ty = RowTypeDescriptor::builder("user", "users")
            .key_field("id")
            .build()
            .unwrap();

        let nodes = CompositeKeyResolver::resolve(&ty, &json!(7)).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].to_string(), "users.id = 7");
    }

    #[test]
    fn test_composite_key_in_column_order() {
        let nodes = CompositeKeyResolver::resolve(&enrollment(), &json!([1, 42])).unwrap();
        let rendered: Vec<_> = nodes.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["enrollments.student_id = 1", "enrollments.course_id = 42"]
        );
    }

    #[test]
    fn test_composite_key_arity() {
        let cases = [
            (json!([1]), 1),
            (json!([1, 2, 3]), 3),
            (json!(1), 1),
            (json!([]), 0),
        ];
        for (value, received) in cases {
            let err = CompositeKeyResolver::resolve(&enrollment(), &value).unwrap_err();
            assert_eq!(
                err,
                CompileError::CompositeKeyArityError {
                    expected: 2,
                    received,
                }
            );
        }
    }
}
