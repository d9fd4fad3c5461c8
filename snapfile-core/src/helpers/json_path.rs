//! Dot paths into JSON documents.
//!
//! `user.emails.0` addresses the first element of the `emails` array of the
//! `user` object. A literal dot inside a key is written `\.`.

use serde_json::Value;

/// Split a path into its segments, resolving `\.` escapes.
pub fn segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Value at `path`, if every segment exists.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .iter()
        .try_fold(value, |node, segment| match node {
            Value::Object(map) => map.get(segment.as_str()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Mutable value at `path`, if every segment exists.
pub fn get_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut node = value;
    for segment in segments(path) {
        node = match node {
            Value::Object(map) => map.get_mut(segment.as_str())?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Replace the value at an existing `path`. Returns `false` when the path
/// does not exist; the document is left untouched in that case.
pub fn set(value: &mut Value, path: &str, replacement: Value) -> bool {
    match get_mut(value, path) {
        Some(node) => {
            *node = replacement;
            true
        }
        None => false,
    }
}
