//! High-level snapshot operations.

pub mod clean;
pub mod context;
pub mod json;
pub mod matcher;
pub mod skip;

pub use clean::{clean, summary, CleanReport};
pub use context::Snaps;
pub use json::{apply_matchers, Any, Custom, JsonKind, JsonMatcher, Type};
pub use matcher::{JsonInput, Matcher};
pub use skip::SkipTracker;
