//! Structured event logger
//!
//! Thin front over `tracing`: one call = one event, level taken from the
//! event, fields rendered in alphabetical key order so output is stable.

use std::fmt;

use super::events::{Event, Severity};

/// Emits typed events through `tracing`
pub struct Logger;

impl Logger {
    /// Emit an event with the given fields
    pub fn emit(event: Event, fields: &[(&str, &str)]) {
        let fields = SortedFields(fields);
        match event.severity() {
            Severity::Trace => tracing::trace!(event = event.as_str(), %fields),
            Severity::Debug => tracing::debug!(event = event.as_str(), %fields),
            Severity::Warn => tracing::warn!(event = event.as_str(), %fields),
        }
    }
}

/// Renders `key=value` pairs sorted by key
struct SortedFields<'a>(&'a [(&'a str, &'a str)]);

impl fmt::Display for SortedFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<_> = self.0.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        for (idx, (key, value)) in sorted.into_iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_fields_sorted_by_key() {
        let fields = [("operator", "bogus"), ("field", "name")];
        let rendered = SortedFields(&fields).to_string();
        assert_eq!(rendered, "field=\"name\" operator=\"bogus\"");
    }

    #[test]
    fn test_emit_without_subscriber() {
        // No subscriber installed: must be a silent no-op
        Logger::emit(Event::UnknownOperator, &[("field", "name")]);
    }

    #[test]
    #[traced_test]
    fn test_emit_reaches_subscriber() {
        Logger::emit(Event::UnknownOperator, &[("operator", "bogus"), ("field", "name")]);

        assert!(logs_contain("FILTER_UNKNOWN_OPERATOR"));
        assert!(logs_contain("field=\"name\" operator=\"bogus\""));
    }
}
