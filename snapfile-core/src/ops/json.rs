//! Matchers rewriting or validating parts of a JSON document before it is
//! snapshotted.
//!
//! Each matcher addresses values through dot paths (see
//! [`crate::helpers::json_path`]). A matcher either returns the rewritten
//! document or every error it ran into; a failed matcher leaves the document
//! as it was.

use std::fmt;

use serde_json::Value;

use crate::helpers::json_path;
use crate::types::MatcherError;

/// A step applied to a JSON document before it is snapshotted.
pub trait JsonMatcher {
    fn apply(&self, doc: Value) -> Result<Value, Vec<MatcherError>>;
}

/// Run `matchers` in order, collecting every error.
pub fn apply_matchers(
    mut doc: Value,
    matchers: &[&dyn JsonMatcher],
) -> Result<Value, Vec<MatcherError>> {
    let mut errors = Vec::new();
    for matcher in matchers {
        match matcher.apply(doc.clone()) {
            Ok(updated) => doc = updated,
            Err(errs) => errors.extend(errs),
        }
    }

    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(errors)
    }
}

fn finish(doc: Value, errors: Vec<MatcherError>) -> Result<Value, Vec<MatcherError>> {
    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(errors)
    }
}

/// Replaces the value at each path with a placeholder.
///
/// Useful for fields that change between runs, like timestamps or ids.
#[derive(Debug, Clone)]
pub struct Any {
    paths: Vec<String>,
    placeholder: Value,
    err_on_missing_path: bool,
}

impl Any {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            placeholder: Value::from("<Any value>"),
            err_on_missing_path: true,
        }
    }

    /// Value written in place of matched values. Defaults to `"<Any value>"`.
    pub fn placeholder(mut self, placeholder: impl Into<Value>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Whether a missing path is an error. Defaults to `true`.
    pub fn err_on_missing_path(mut self, err: bool) -> Self {
        self.err_on_missing_path = err;
        self
    }
}

impl JsonMatcher for Any {
    fn apply(&self, mut doc: Value) -> Result<Value, Vec<MatcherError>> {
        let mut errors = Vec::new();
        for path in &self.paths {
            let found = json_path::set(&mut doc, path, self.placeholder.clone());
            if !found && self.err_on_missing_path {
                errors.push(MatcherError::missing_path("Any", path));
            }
        }
        finish(doc, errors)
    }
}

/// Kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "bool",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asserts the kind of the value at each path and replaces it with
/// `"<Type:kind>"`.
#[derive(Debug, Clone)]
pub struct Type {
    kind: JsonKind,
    paths: Vec<String>,
    err_on_missing_path: bool,
}

impl Type {
    pub fn new<I, S>(kind: JsonKind, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            paths: paths.into_iter().map(Into::into).collect(),
            err_on_missing_path: true,
        }
    }

    pub fn err_on_missing_path(mut self, err: bool) -> Self {
        self.err_on_missing_path = err;
        self
    }
}

impl JsonMatcher for Type {
    fn apply(&self, mut doc: Value) -> Result<Value, Vec<MatcherError>> {
        let mut errors = Vec::new();
        for path in &self.paths {
            let Some(node) = json_path::get_mut(&mut doc, path) else {
                if self.err_on_missing_path {
                    errors.push(MatcherError::missing_path("Type", path));
                }
                continue;
            };

            let actual = JsonKind::of(node);
            if actual != self.kind {
                errors.push(MatcherError::new(
                    "Type",
                    path,
                    format!("expected type {}, received {}", self.kind, actual),
                ));
                continue;
            }
            *node = Value::from(format!("<Type:{}>", actual));
        }
        finish(doc, errors)
    }
}

type Callback = Box<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Hands the value at a path to a callback, which returns its replacement
/// or the reason it is not acceptable.
pub struct Custom {
    path: String,
    callback: Callback,
    err_on_missing_path: bool,
}

impl Custom {
    pub fn new<F>(path: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            callback: Box::new(callback),
            err_on_missing_path: true,
        }
    }

    pub fn err_on_missing_path(mut self, err: bool) -> Self {
        self.err_on_missing_path = err;
        self
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom")
            .field("path", &self.path)
            .field("err_on_missing_path", &self.err_on_missing_path)
            .finish_non_exhaustive()
    }
}

impl JsonMatcher for Custom {
    fn apply(&self, mut doc: Value) -> Result<Value, Vec<MatcherError>> {
        let Some(node) = json_path::get_mut(&mut doc, &self.path) else {
            if self.err_on_missing_path {
                return Err(vec![MatcherError::missing_path("Custom", &self.path)]);
            }
            return Ok(doc);
        };

        match (self.callback)(node) {
            Ok(replacement) => {
                *node = replacement;
                Ok(doc)
            }
            Err(reason) => Err(vec![MatcherError::new("Custom", &self.path, reason)]),
        }
    }
}
