//! Field resolution against row type metadata
//!
//! Pure lookups: a name either resolves to the requested kind of member,
//! is missing (`FieldNotFound`), or names the other kind (`InvalidFieldKind`).

use super::types::{FieldDescriptor, Member, MemberKind, RelationshipDescriptor, RowTypeDescriptor};
use crate::errors::{CompileError, CompileResult};

/// Resolves member names into descriptors
pub struct FieldResolver;

impl FieldResolver {
    /// Resolves a scalar field
    pub fn resolve<'a>(
        ty: &'a RowTypeDescriptor,
        name: &str,
    ) -> CompileResult<&'a FieldDescriptor> {
        match Self::resolve_member(ty, name)? {
            Member::Field(field) => Ok(field),
            Member::Relationship(_) => Err(Self::wrong_kind(ty, name, MemberKind::Field)),
        }
    }

    /// Resolves a relationship
    pub fn resolve_relationship<'a>(
        ty: &'a RowTypeDescriptor,
        name: &str,
    ) -> CompileResult<&'a RelationshipDescriptor> {
        match Self::resolve_member(ty, name)? {
            Member::Relationship(rel) => Ok(rel),
            Member::Field(_) => Err(Self::wrong_kind(ty, name, MemberKind::Relationship)),
        }
    }

    /// Resolves a member of either kind
    pub fn resolve_member<'a>(ty: &'a RowTypeDescriptor, name: &str) -> CompileResult<Member<'a>> {
        ty.member(name)
            .ok_or_else(|| CompileError::field_not_found(ty.name(), name))
    }

    fn wrong_kind(ty: &RowTypeDescriptor, name: &str, expected: MemberKind) -> CompileError {
        let found = match expected {
            MemberKind::Field => MemberKind::Relationship,
            MemberKind::Relationship => MemberKind::Field,
        };
        CompileError::InvalidFieldKind {
            type_name: ty.name().to_string(),
            field: name.to_string(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> RowTypeDescriptor {
        RowTypeDescriptor::builder("user", "users")
            .key_field("id")
            .field("name")
            .relationship("posts", "post")
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_scalar_field() {
        let ty = user();
        let field = FieldResolver::resolve(&ty, "name").unwrap();
        assert_eq!(field.name(), "name");
        assert_eq!(field.column().table(), "users");
    }

    #[test]
    fn test_resolve_missing_field() {
        let ty = user();
        let err = FieldResolver::resolve(&ty, "nonexistent_column").unwrap_err();
        assert_eq!(
            err,
            CompileError::FieldNotFound {
                type_name: "user".into(),
                field: "nonexistent_column".into(),
            }
        );
    }

    #[test]
    fn test_relationship_is_not_a_column() {
        let ty = user();
        let err = FieldResolver::resolve(&ty, "posts").unwrap_err();
        assert_eq!(err.code(), "INVALID_FIELD_KIND");
    }

    #[test]
    fn test_column_is_not_a_relationship() {
        let ty = user();
        assert!(FieldResolver::resolve_relationship(&ty, "posts").is_ok());
        assert!(matches!(
            FieldResolver::resolve_relationship(&ty, "name"),
            Err(CompileError::InvalidFieldKind {
                expected: MemberKind::Relationship,
                found: MemberKind::Field,
                ..
            })
        ));
    }
}
