//! Row type descriptors
//!
//! A `RowTypeDescriptor` is the immutable metadata for one storage entity:
//! its scalar fields (each bound to a column handle), its relationships to
//! other row types, and its ordered primary key.
//!
//! Descriptors are built once, typically at startup, and shared read-only
//! between every compiler invocation. Name lookups go through a prebuilt
//! `name -> member` map.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::errors::{SchemaError, SchemaResult};

/// Opaque handle to a storage column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnHandle {
    table: String,
    column: String,
}

impl ColumnHandle {
    /// Create a column handle
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns `table.column`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// A scalar field: attribute name plus the column it maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    name: String,
    column: ColumnHandle,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &ColumnHandle {
        &self.column
    }
}

/// A relationship to another row type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipDescriptor {
    name: String,
    target: String,
}

impl RelationshipDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the related row type
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Kind of a named member, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Relationship,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Relationship => "relationship",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved member of a row type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'a> {
    Field(&'a FieldDescriptor),
    Relationship(&'a RelationshipDescriptor),
}

impl Member<'_> {
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Field(_) => MemberKind::Field,
            Member::Relationship(_) => MemberKind::Relationship,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::Field(field) => field.name(),
            Member::Relationship(rel) => rel.name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Field(usize),
    Relationship(usize),
}

/// Immutable metadata for one storage entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTypeDescriptor {
    name: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    /// Indexes into `fields`, in key order
    primary_key: Vec<usize>,
    members: HashMap<String, Slot>,
}

impl RowTypeDescriptor {
    /// Start building a descriptor for `name` stored in `table`
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> RowTypeBuilder {
        RowTypeBuilder {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
            relationships: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Scalar fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Relationships in declaration order
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    /// Primary key fields in key order
    pub fn primary_key(&self) -> impl ExactSizeIterator<Item = &FieldDescriptor> + '_ {
        self.primary_key.iter().map(|&idx| &self.fields[idx])
    }

    /// Number of primary key columns
    pub fn primary_key_arity(&self) -> usize {
        self.primary_key.len()
    }

    /// Looks up a member by name
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        self.members.get(name).map(|slot| match *slot {
            Slot::Field(idx) => Member::Field(&self.fields[idx]),
            Slot::Relationship(idx) => Member::Relationship(&self.relationships[idx]),
        })
    }

    /// Checks whether a scalar field with this name exists
    pub fn has_field(&self, name: &str) -> bool {
        matches!(self.members.get(name), Some(Slot::Field(_)))
    }
}

/// Builder for `RowTypeDescriptor`
#[derive(Debug, Clone)]
pub struct RowTypeBuilder {
    name: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
    primary_key: Vec<String>,
}

impl RowTypeBuilder {
    /// Declare a scalar field whose column shares its name
    pub fn field(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let column = name.clone();
        self.field_as(name, column)
    }

    /// Declare a scalar field mapped to a differently named column
    pub fn field_as(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        let column = ColumnHandle::new(self.table.clone(), column);
        self.fields.push(FieldDescriptor {
            name: name.into(),
            column,
        });
        self
    }

    /// Declare a scalar field and append it to the primary key
    pub fn key_field(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut builder = self.field(name.clone());
        builder.primary_key.push(name);
        builder
    }

    /// Declare a relationship to the `target` row type
    pub fn relationship(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationships.push(RelationshipDescriptor {
            name: name.into(),
            target: target.into(),
        });
        self
    }

    /// Set the primary key from already declared fields
    pub fn primary_key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Validate and freeze the descriptor
    pub fn build(self) -> SchemaResult<RowTypeDescriptor> {
        let mut members = HashMap::with_capacity(self.fields.len() + self.relationships.len());

        let slots = self
            .fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.as_str(), Slot::Field(idx)))
            .chain(
                self.relationships
                    .iter()
                    .enumerate()
                    .map(|(idx, r)| (r.name.as_str(), Slot::Relationship(idx))),
            );

        for (name, slot) in slots {
            if members.insert(name.to_string(), slot).is_some() {
                return Err(SchemaError::DuplicateMember {
                    type_name: self.name.clone(),
                    member: name.to_string(),
                });
            }
        }

        if self.primary_key.is_empty() {
            return Err(SchemaError::MissingPrimaryKey(self.name));
        }

        let mut primary_key = Vec::with_capacity(self.primary_key.len());
        for name in &self.primary_key {
            match members.get(name) {
                Some(Slot::Field(idx)) if !primary_key.contains(idx) => primary_key.push(*idx),
                Some(Slot::Field(_)) => {
                    return Err(SchemaError::DuplicateMember {
                        type_name: self.name.clone(),
                        member: name.clone(),
                    })
                }
                _ => {
                    return Err(SchemaError::InvalidPrimaryKey {
                        type_name: self.name.clone(),
                        member: name.clone(),
                    })
                }
            }
        }

        Ok(RowTypeDescriptor {
            name: self.name,
            table: self.table,
            fields: self.fields,
            relationships: self.relationships,
            primary_key,
            members,
        })
    }
}
