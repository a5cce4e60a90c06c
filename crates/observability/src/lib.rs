//! Process-wide tracing setup for binaries and tests that embed the engine.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left to
//! whoever owns the process, through [`init`] or [`init_with_filter`].

pub mod tracing;

pub use self::tracing::{DEFAULT_FILTER, init, init_with_filter};
