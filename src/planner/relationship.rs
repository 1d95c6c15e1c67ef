//! # Relationship Planning
//!
//! Resolves eager-load and join specifications into ordered directive
//! lists. Both accept either a plain list of names (defaults applied) or
//! explicit `(name, token)` pairs.
//!
//! - Load directives: a later directive on the same attribute replaces the
//!   earlier one in place (last writer wins, position kept).
//! - Join directives: kept in call order, duplicates included.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::errors::{CompileError, CompileResult};
use crate::filter::{CompareOp, Operand, PredicateNode};
use crate::observability::{Event, Logger};
use crate::schema::{FieldResolver, RowTypeDescriptor};

/// Eager-load strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStrategy {
    #[serde(rename = "contains_eager")]
    ContainsEager,
    #[serde(rename = "defaultload")]
    DefaultLoad,
    #[serde(rename = "immediateload")]
    ImmediateLoad,
    #[serde(rename = "joinedload")]
    JoinedLoad,
    #[serde(rename = "lazyload")]
    LazyLoad,
    #[serde(rename = "noload")]
    NoLoad,
    #[serde(rename = "raiseload")]
    RaiseLoad,
    #[serde(rename = "selectinload")]
    SelectInLoad,
    #[serde(rename = "subqueryload")]
    SubqueryLoad,
    #[serde(rename = "defer")]
    Defer,
    #[serde(rename = "load_only")]
    LoadOnly,
    #[serde(rename = "undefer")]
    Undefer,
    #[serde(rename = "undefer_group")]
    UndeferGroup,
}

impl LoadStrategy {
    pub const ALL: [LoadStrategy; 13] = [
        LoadStrategy::ContainsEager,
        LoadStrategy::DefaultLoad,
        LoadStrategy::ImmediateLoad,
        LoadStrategy::JoinedLoad,
        LoadStrategy::LazyLoad,
        LoadStrategy::NoLoad,
        LoadStrategy::RaiseLoad,
        LoadStrategy::SelectInLoad,
        LoadStrategy::SubqueryLoad,
        LoadStrategy::Defer,
        LoadStrategy::LoadOnly,
        LoadStrategy::Undefer,
        LoadStrategy::UndeferGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::ContainsEager => "contains_eager",
            LoadStrategy::DefaultLoad => "defaultload",
            LoadStrategy::ImmediateLoad => "immediateload",
            LoadStrategy::JoinedLoad => "joinedload",
            LoadStrategy::LazyLoad => "lazyload",
            LoadStrategy::NoLoad => "noload",
            LoadStrategy::RaiseLoad => "raiseload",
            LoadStrategy::SelectInLoad => "selectinload",
            LoadStrategy::SubqueryLoad => "subqueryload",
            LoadStrategy::Defer => "defer",
            LoadStrategy::LoadOnly => "load_only",
            LoadStrategy::Undefer => "undefer",
            LoadStrategy::UndeferGroup => "undefer_group",
        }
    }

    /// Parse a strategy token for `relationship`
    pub fn from_token(relationship: &str, token: &str) -> CompileResult<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == token)
            .ok_or_else(|| CompileError::UnknownLoadStrategy {
                relationship: relationship.to_string(),
                strategy: token.to_string(),
            })
    }

    /// Column strategies target scalar fields instead of relationships
    pub fn targets_column(&self) -> bool {
        matches!(
            self,
            LoadStrategy::Defer
                | LoadStrategy::LoadOnly
                | LoadStrategy::Undefer
                | LoadStrategy::UndeferGroup
        )
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join kinds. Right joins are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Full,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Full => "full",
        }
    }

    /// Parse a join kind token for `relationship`
    pub fn from_token(relationship: &str, token: &str) -> CompileResult<Self> {
        match token {
            "inner" => Ok(JoinKind::Inner),
            "left" => Ok(JoinKind::Left),
            "full" => Ok(JoinKind::Full),
            other => Err(CompileError::InvalidJoinKind {
                relationship: relationship.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load-strategy specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSpec {
    /// Relationship names, default strategy
    Relationships(Vec<String>),
    /// `(name, strategy token)` pairs
    Strategies(Vec<(String, String)>),
}

impl LoadSpec {
    pub fn relationships<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LoadSpec::Relationships(names.into_iter().map(Into::into).collect())
    }

    pub fn strategies<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        LoadSpec::Strategies(
            pairs
                .into_iter()
                .map(|(name, token)| (name.into(), token.into()))
                .collect(),
        )
    }
}

/// Explicit join against another row type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    target: Arc<RowTypeDescriptor>,
    on: (String, String),
    also_on: Vec<(String, String)>,
    kind: JoinKind,
    include_in_result: bool,
}

impl JoinSpec {
    /// Join `target` on `left = right`, where `left` is a field of the
    /// joining type and `right` a field of `target`. Inner by default.
    pub fn new(
        target: Arc<RowTypeDescriptor>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self {
            target,
            on: (left.into(), right.into()),
            also_on: Vec::new(),
            kind: JoinKind::Inner,
            include_in_result: false,
        }
    }

    /// Add another equality to the join condition
    pub fn and_on(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.also_on.push((left.into(), right.into()));
        self
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Return joined rows next to the primary rows
    pub fn include_in_result(mut self, include: bool) -> Self {
        self.include_in_result = include;
        self
    }

    pub fn target(&self) -> &Arc<RowTypeDescriptor> {
        &self.target
    }
}

/// One entry of a join list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinItem {
    /// Join a relationship by name
    Relationship(String),
    /// Explicit join
    Explicit(JoinSpec),
}

impl From<&str> for JoinItem {
    fn from(name: &str) -> Self {
        JoinItem::Relationship(name.to_string())
    }
}

impl From<String> for JoinItem {
    fn from(name: String) -> Self {
        JoinItem::Relationship(name)
    }
}

impl From<JoinSpec> for JoinItem {
    fn from(spec: JoinSpec) -> Self {
        JoinItem::Explicit(spec)
    }
}

/// Join specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinsSpec {
    List(Vec<JoinItem>),
    /// `(relationship, join kind token)` pairs
    Kinds(Vec<(String, String)>),
}

impl JoinsSpec {
    pub fn list<I, J>(items: I) -> Self
    where
        I: IntoIterator<Item = J>,
        J: Into<JoinItem>,
    {
        JoinsSpec::List(items.into_iter().map(Into::into).collect())
    }

    pub fn kinds<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        JoinsSpec::Kinds(
            pairs
                .into_iter()
                .map(|(name, kind)| (name.into(), kind.into()))
                .collect(),
        )
    }
}

/// Resolved load directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadDirective {
    pub attribute: String,
    pub strategy: LoadStrategy,
}

/// Resolved join directive
#[derive(Debug, Clone, PartialEq)]
pub enum JoinDirective {
    /// Join along a declared relationship
    Relationship {
        relationship: String,
        target: String,
        kind: JoinKind,
    },
    /// Join another row type on an explicit condition
    Explicit {
        target: Arc<RowTypeDescriptor>,
        on: PredicateNode,
        kind: JoinKind,
        include_in_result: bool,
    },
}

impl JoinDirective {
    pub fn kind(&self) -> JoinKind {
        match self {
            JoinDirective::Relationship { kind, .. }
            | JoinDirective::Explicit { kind, .. } => *kind,
        }
    }

    /// Whether joined rows are returned alongside primary rows
    pub fn includes_in_result(&self) -> bool {
        matches!(
            self,
            JoinDirective::Explicit {
                include_in_result: true,
                ..
            }
        )
    }
}

/// Builds load and join directives
#[derive(Debug, Clone, Copy)]
pub struct RelationshipPlanner {
    default_strategy: LoadStrategy,
    default_join_kind: JoinKind,
}

impl Default for RelationshipPlanner {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}

impl RelationshipPlanner {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            default_strategy: config.default_load_strategy,
            default_join_kind: config.default_join_kind,
        }
    }

    /// Resolve a load specification
    pub fn build_load_strategies(
        &self,
        ty: &RowTypeDescriptor,
        spec: &LoadSpec,
    ) -> CompileResult<Vec<LoadDirective>> {
        let mut directives: Vec<LoadDirective> = Vec::new();

        let mut push = |name: &str, strategy: LoadStrategy| -> CompileResult<()> {
            if strategy.targets_column() {
                FieldResolver::resolve(ty, name)?;
            } else {
                FieldResolver::resolve_relationship(ty, name)?;
            }

            match directives.iter_mut().find(|d| d.attribute == name) {
                Some(existing) => {
                    Logger::emit(
                        Event::LoadStrategyOverridden,
                        &[
                            ("attribute", name),
                            ("previous", existing.strategy.as_str()),
                            ("strategy", strategy.as_str()),
                        ],
                    );
                    existing.strategy = strategy;
                }
                None => directives.push(LoadDirective {
                    attribute: name.to_string(),
                    strategy,
                }),
            }
            Ok(())
        };

        match spec {
            LoadSpec::Relationships(names) => {
                for name in names {
                    push(name, self.default_strategy)?;
                }
            }
            LoadSpec::Strategies(pairs) => {
                for (name, token) in pairs {
                    let strategy = LoadStrategy::from_token(name, token)?;
                    push(name, strategy)?;
                }
            }
        }

        Ok(directives)
    }

    /// Resolve a join specification, preserving call order
    pub fn build_joins(
        &self,
        ty: &RowTypeDescriptor,
        spec: &JoinsSpec,
    ) -> CompileResult<Vec<JoinDirective>> {
        match spec {
            JoinsSpec::List(items) => items
                .iter()
                .map(|item| match item {
                    JoinItem::Relationship(name) => {
                        self.relationship_join(ty, name, self.default_join_kind)
                    }
                    JoinItem::Explicit(join) => explicit_join(ty, join),
                })
                .collect(),
            JoinsSpec::Kinds(pairs) => pairs
                .iter()
                .map(|(name, token)| {
                    let kind = JoinKind::from_token(name, token)?;
                    self.relationship_join(ty, name, kind)
                })
                .collect(),
        }
    }

    fn relationship_join(
        &self,
        ty: &RowTypeDescriptor,
        name: &str,
        kind: JoinKind,
    ) -> CompileResult<JoinDirective> {
        let relationship = FieldResolver::resolve_relationship(ty, name)?;
        Ok(JoinDirective::Relationship {
            relationship: relationship.name().to_string(),
            target: relationship.target().to_string(),
            kind,
        })
    }
}

fn explicit_join(ty: &RowTypeDescriptor, join: &JoinSpec) -> CompileResult<JoinDirective> {
    let equality = |(left, right): &(String, String)| -> CompileResult<PredicateNode> {
        let left = FieldResolver::resolve(ty, left)?;
        let right = FieldResolver::resolve(&join.target, right)?;
        Ok(PredicateNode::Comparison {
            field: left.clone(),
            op: CompareOp::Eq,
            operand: Operand::Column(right.column().clone()),
        })
    };

    let first = equality(&join.on)?;
    let on = if join.also_on.is_empty() {
        first
    } else {
        let mut children = Vec::with_capacity(join.also_on.len() + 1);
        children.push(first);
        for pair in &join.also_on {
            children.push(equality(pair)?);
        }
        PredicateNode::And { children }
    };

    Ok(JoinDirective::Explicit {
        target: Arc::clone(&join.target),
        on,
        kind: join.kind,
        include_in_result: join.include_in_result,
    })
}
