//! Observability for crudplus
//!
//! Compilation is pure, so observability is limited to diagnostics:
//! degraded input (unknown operators), dropped empty groups, overridden
//! directives, and statements handed to a unit of work.
//!
//! Events go through `tracing`; installing a subscriber is the caller's
//! business.

mod events;
mod logger;

pub use events::{Event, Severity};
pub use logger::Logger;
