//! snapfile core library
//!
//! Snapshot engine behind the `snapfile` test macros. A snapshot is the
//! rendered text of a value, stored next to the test that produced it and
//! compared on every later run.
//!
//! # Architecture
//!
//! - `types`: configuration, errors, event counters, the test context trait
//! - `helpers`: sequence matcher and diff report, serializer, occurrence
//!   registries, snapshot file store, natural sort, JSON paths
//! - `ops`: the shared [`Snaps`] context, per-call [`Matcher`], JSON
//!   matchers, skip tracking and the obsolete snapshot scan

pub mod helpers;
pub mod ops;
pub mod types;

// Re-export commonly used types at crate root
pub use types::{
    CleanOptions, Config, Environment, MatcherError, Result, SnapError, TestEvent, TestEvents,
    TestingT, DEFAULT_SNAPS_DIR, SNAPS_EXT, UPDATE_ENV_VAR,
};

pub use ops::{
    summary, Any, CleanReport, Custom, JsonInput, JsonKind, JsonMatcher, Matcher, Snaps, Type,
};

pub use helpers::caller::SourceLocation;
pub use helpers::serializer::{Pretty, SnapshotValue};
