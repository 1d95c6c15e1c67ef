//! Observable events for crudplus
//!
//! Events are explicit and typed. Each one has a fixed severity so call
//! sites never pick a level ad hoc.

use std::fmt;

/// Severity of an emitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fine-grained detail
    Trace,
    /// Normal operations
    Debug,
    /// Input was degraded rather than rejected
    Warn,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Warn => "WARN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Filter compilation
    /// Operator token not recognised, predicate skipped
    UnknownOperator,
    /// OR-group produced no predicates
    EmptyOrGroupDropped,
    /// Arithmetic filter had an empty condition
    EmptyArithmeticDropped,

    // Relationship planning
    /// A later load directive replaced an earlier one
    LoadStrategyOverridden,

    // Unit of work
    /// Statement handed to the unit of work
    StatementDispatched,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::UnknownOperator => "FILTER_UNKNOWN_OPERATOR",
            Event::EmptyOrGroupDropped => "FILTER_EMPTY_OR_GROUP",
            Event::EmptyArithmeticDropped => "FILTER_EMPTY_ARITHMETIC",
            Event::LoadStrategyOverridden => "LOAD_STRATEGY_OVERRIDDEN",
            Event::StatementDispatched => "STATEMENT_DISPATCHED",
        }
    }

    /// Returns the fixed severity for this event
    pub fn severity(&self) -> Severity {
        match self {
            Event::UnknownOperator => Severity::Warn,
            Event::EmptyOrGroupDropped | Event::EmptyArithmeticDropped => Severity::Debug,
            Event::LoadStrategyOverridden => Severity::Debug,
            Event::StatementDispatched => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
