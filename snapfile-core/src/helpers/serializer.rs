//! Render values into the text stored in snapshots.
//!
//! Rendering is pure: escaping the entry delimiter is the store's job.

use std::fmt;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::types::Result;

/// A value that can be rendered into a snapshot.
///
/// Implemented for the primitive types, strings and options. Anything that
/// implements `Debug` can be rendered through [`Pretty`].
pub trait SnapshotValue {
    fn snapshot(&self) -> String;
}

macro_rules! impl_tagged {
    ($tag:literal => $($ty:ty),+) => {
        $(
            impl SnapshotValue for $ty {
                fn snapshot(&self) -> String {
                    format!(concat!($tag, "({})"), self)
                }
            }
        )+
    };
}

impl_tagged!("int" => i8, i16, i32, i64, i128, isize);
impl_tagged!("uint" => u8, u16, u32, u64, u128, usize);
impl_tagged!("float" => f32, f64);

impl SnapshotValue for bool {
    fn snapshot(&self) -> String {
        self.to_string()
    }
}

impl SnapshotValue for char {
    fn snapshot(&self) -> String {
        self.to_string()
    }
}

impl SnapshotValue for str {
    fn snapshot(&self) -> String {
        self.to_string()
    }
}

impl SnapshotValue for String {
    fn snapshot(&self) -> String {
        self.clone()
    }
}

impl SnapshotValue for Value {
    fn snapshot(&self) -> String {
        self.to_string()
    }
}

impl<T: SnapshotValue + ?Sized> SnapshotValue for &T {
    fn snapshot(&self) -> String {
        (**self).snapshot()
    }
}

impl<T: SnapshotValue> SnapshotValue for Option<T> {
    fn snapshot(&self) -> String {
        match self {
            Some(value) => value.snapshot(),
            None => "nil".to_string(),
        }
    }
}

/// Render any `Debug` value with its pretty (`{:#?}`) representation.
pub struct Pretty<T>(pub T);

impl<T: fmt::Debug> SnapshotValue for Pretty<T> {
    fn snapshot(&self) -> String {
        format!("{:#?}", self.0)
    }
}

/// Render each value and join them with a newline, in argument order.
pub fn take_snapshot(values: &[&dyn SnapshotValue]) -> String {
    values
        .iter()
        .map(|value| value.snapshot())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty-print a JSON document with one-space indentation.
///
/// Object keys keep their insertion order unless `sort_keys` is set.
pub fn take_json_snapshot(value: &Value, sort_keys: bool) -> Result<String> {
    let sorted;
    let value = if sort_keys {
        sorted = sort_json_keys(value.clone());
        &sorted
    } else {
        value
    };

    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Recursively sort object keys.
pub fn sort_json_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, sort_json_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json_keys).collect()),
        other => other,
    }
}
