//! Run observability.
//!
//! - [`EventLog`]: thread-safe, append-only audit trail
//! - [`Event`] / [`EventKind`]: pipeline, stage and task level events

mod log;

pub use log::{Event, EventKind, EventLog};
