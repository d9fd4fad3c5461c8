//! Core data types for snapshot matching.

pub mod config;
pub mod error;
pub mod event;
pub mod testing;

pub use config::{CleanOptions, Config, Environment, DEFAULT_SNAPS_DIR, SNAPS_EXT, UPDATE_ENV_VAR};
pub use error::{MatcherError, Result, SnapError};
pub use event::{TestEvent, TestEvents};
pub use testing::TestingT;
