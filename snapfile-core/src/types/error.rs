//! Snapshot error types.
//!
//! Every error produced while matching a snapshot is reported through the
//! test's failure hook, never by aborting the process.

use std::fmt;

use crate::helpers::symbols::ERROR_SYMBOL;

/// Result type for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapError>;

/// Main error type for snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapError {
    /// No stored snapshot exists yet for this call site.
    #[error("snapshot not found")]
    NotFound,

    /// Input passed to a JSON snapshot is not valid JSON.
    #[error("invalid json")]
    InvalidJson,

    /// Value could not be serialized.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    /// Reading or writing snapshot files failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more JSON matchers failed.
    #[error("{}", MatcherErrors(.0))]
    Matchers(Vec<MatcherError>),

    /// The run filter is not a valid regular expression.
    #[error("invalid run filter {pattern:?}: {message}")]
    InvalidRunFilter { pattern: String, message: String },
}

impl SnapError {
    /// Whether this is the distinguished "no snapshot yet" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SnapError::NotFound)
    }
}

/// A single failure raised by a JSON matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherError {
    /// Why the matcher failed.
    pub reason: String,
    /// Matcher name, e.g. `Any`.
    pub matcher: String,
    /// The JSON path the matcher was applied to.
    pub path: String,
}

impl MatcherError {
    pub fn new(matcher: &str, path: &str, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            matcher: matcher.to_string(),
            path: path.to_string(),
        }
    }

    /// The matcher reports the path as missing.
    pub fn missing_path(matcher: &str, path: &str) -> Self {
        Self::new(matcher, path, "path does not exist")
    }
}

impl fmt::Display for MatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}match.{}(\"{}\") - {}",
            ERROR_SYMBOL, self.matcher, self.path, self.reason
        )
    }
}

struct MatcherErrors<'a>(&'a [MatcherError]);

impl fmt::Display for MatcherErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for err in self.0 {
            write!(f, "\n{}", err)?;
        }
        Ok(())
    }
}
