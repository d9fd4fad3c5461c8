//! Per-call match flow.
//!
//! Every call resolves its snapshot location, takes an occurrence from the
//! registry, loads the stored snapshot and then passes, fails with a diff,
//! creates or updates it. Each outcome increments exactly one event counter
//! and failures go through [`TestingT::error`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::helpers::caller::SourceLocation;
use crate::helpers::registry::OCCURRENCE_PLACEHOLDER;
use crate::helpers::report::diff_report;
use crate::helpers::serializer::{take_json_snapshot, take_snapshot, SnapshotValue};
use crate::helpers::store;
use crate::ops::context::Snaps;
use crate::ops::json::{apply_matchers, JsonMatcher};
use crate::types::{Config, Result, SnapError, TestEvent, TestingT, SNAPS_EXT};

pub const ADDED_MSG: &str = "✎ Snapshot added";
pub const UPDATED_MSG: &str = "✎ Snapshot updated";
pub const SKIPPED_MSG: &str = "⟳ Snapshot skipped";
pub const NO_VALUES_MSG: &str = "[warning] match_snapshot call without params";

/// Input of a JSON snapshot.
#[derive(Debug)]
pub enum JsonInput<'a> {
    /// JSON text. Must be valid JSON.
    Raw(&'a [u8]),
    /// A value already converted through serde.
    Serialized(std::result::Result<Value, serde_json::Error>),
}

impl<'a> JsonInput<'a> {
    pub fn raw<B: AsRef<[u8]> + ?Sized>(bytes: &'a B) -> Self {
        JsonInput::Raw(bytes.as_ref())
    }

    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        JsonInput::Serialized(serde_json::to_value(value))
    }

    fn into_value(self) -> Result<Value> {
        match self {
            JsonInput::Raw(bytes) => {
                serde_json::from_slice(bytes).map_err(|_| SnapError::InvalidJson)
            }
            JsonInput::Serialized(value) => Ok(value?),
        }
    }
}

impl<'a> From<&'a str> for JsonInput<'a> {
    fn from(s: &'a str) -> Self {
        JsonInput::Raw(s.as_bytes())
    }
}

impl<'a> From<&'a String> for JsonInput<'a> {
    fn from(s: &'a String) -> Self {
        JsonInput::Raw(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for JsonInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        JsonInput::Raw(bytes)
    }
}

impl From<Value> for JsonInput<'_> {
    fn from(value: Value) -> Self {
        JsonInput::Serialized(Ok(value))
    }
}

/// Snapshot matcher bound to one test and one call site.
pub struct Matcher<'a> {
    snaps: &'a Snaps,
    config: Config,
    t: &'a dyn TestingT,
    caller: SourceLocation,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(
        snaps: &'a Snaps,
        config: Config,
        t: &'a dyn TestingT,
        caller: SourceLocation,
    ) -> Self {
        Self {
            snaps,
            config,
            t,
            caller,
        }
    }

    /// Directory holding snapshots for this call site.
    pub fn snapshot_dir(&self) -> PathBuf {
        let dir = self.config.get_dir();
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.caller.dir().join(dir)
        }
    }

    /// Path to `path` relative to the calling source file's directory.
    fn relative(&self, path: &Path) -> String {
        pathdiff::diff_paths(path, self.caller.dir())
            .unwrap_or_else(|| path.to_path_buf())
            .display()
            .to_string()
    }

    /// Shared snapshot file for this call site and its relative form.
    pub fn shared_path(&self) -> (PathBuf, String) {
        let name = match self.config.get_filename() {
            Some(name) => name.to_string(),
            None => self.caller.stem(),
        };
        let path = self
            .snapshot_dir()
            .join(format!("{}{}{}", name, SNAPS_EXT, self.config.get_ext()));
        let rel = self.relative(&path);
        (path, rel)
    }

    /// Generic standalone path, with the occurrence placeholder, and its
    /// relative form.
    pub fn standalone_path(&self) -> (String, String) {
        let name = match self.config.get_filename() {
            Some(name) => name.to_string(),
            None => self.t.name().replace('/', "_"),
        };
        let path = self.snapshot_dir().join(format!(
            "{}_{}{}{}",
            name,
            OCCURRENCE_PLACEHOLDER,
            SNAPS_EXT,
            self.config.get_ext()
        ));
        let rel = self.relative(&path);
        (path.display().to_string(), rel)
    }

    fn should_update(&self) -> bool {
        self.snaps.environment().should_update(self.config.get_update())
    }

    /// Compare `values`, rendered and joined by newlines, with this call's
    /// entry in the shared snapshot file.
    pub fn match_snapshot(&self, values: &[&dyn SnapshotValue]) {
        self.t.helper();

        if values.is_empty() {
            self.t.log(NO_VALUES_MSG);
            return;
        }

        let (path, rel) = self.shared_path();
        let id = self.take_entry_id(&path);
        let received = take_snapshot(values);
        self.compare_entry(&path, &rel, &id, &received, false);
    }

    /// Compare `value` with its own snapshot file.
    pub fn match_standalone_snapshot(&self, value: &dyn SnapshotValue) {
        self.t.helper();

        let (generic, generic_rel) = self.standalone_path();
        let (path, rel) = self.snaps.standalone_registry().get_occurrence(&generic, &generic_rel);
        let registry = Arc::clone(self.snaps.standalone_registry());
        self.t.cleanup(Box::new(move || registry.reset(&generic)));

        let received = value.snapshot();
        self.compare_standalone(Path::new(&path), &rel, &received);
    }

    /// Compare a JSON document, after running `matchers` on it, with this
    /// call's entry in the shared snapshot file.
    pub fn match_json(&self, input: JsonInput<'_>, matchers: &[&dyn JsonMatcher]) {
        self.t.helper();

        let (path, rel) = self.shared_path();
        let id = self.take_entry_id(&path);

        let value = match input.into_value() {
            Ok(value) => value,
            Err(err) => return self.fail(&err.to_string()),
        };
        let value = match apply_matchers(value, matchers) {
            Ok(value) => value,
            Err(errors) => return self.fail(&SnapError::Matchers(errors).to_string()),
        };
        let received = match take_json_snapshot(&value, self.config.get_sort_keys()) {
            Ok(received) => received,
            Err(err) => return self.fail(&err.to_string()),
        };

        self.compare_entry(&path, &rel, &id, &received, true);
    }

    /// Occurrence id for the running test in `path`; numbering restarts
    /// when the test finishes.
    fn take_entry_id(&self, path: &Path) -> String {
        let test_name = self.t.name();
        let id = self.snaps.registry().get_test_id(path, &test_name);

        let registry = Arc::clone(self.snaps.registry());
        let path = path.to_path_buf();
        self.t.cleanup(Box::new(move || registry.reset(&path, &test_name)));
        id
    }

    fn compare_entry(&self, path: &Path, rel: &str, id: &str, received: &str, json: bool) {
        let (stored, line) = match store::read_entry(path, id) {
            Ok(found) => found,
            Err(err) if err.is_not_found() => {
                return self.create(err, || store::add_entry(path, id, received));
            }
            Err(err) => return self.fail(&err.to_string()),
        };

        if json && json_equal(&stored, received) {
            return self.pass();
        }
        let Some(report) = diff_report(&stored, received, Some((rel, line))) else {
            return self.pass();
        };

        self.update(&report, || store::update_entry(path, id, received));
    }

    fn compare_standalone(&self, path: &Path, rel: &str, received: &str) {
        let stored = match store::read_standalone(path) {
            Ok(stored) => stored,
            Err(err) if err.is_not_found() => {
                return self.create(err, || store::upsert_standalone(path, received));
            }
            Err(err) => return self.fail(&err.to_string()),
        };

        let Some(report) = diff_report(&stored, received, Some((rel, 1))) else {
            return self.pass();
        };

        self.update(&report, || store::upsert_standalone(path, received));
    }

    fn create<F>(&self, not_found: SnapError, write: F)
    where
        F: FnOnce() -> Result<()>,
    {
        if self.snaps.environment().is_ci {
            log::debug!("Not creating snapshot for {} on CI", self.t.name());
            return self.fail(&not_found.to_string());
        }

        if let Err(err) = write() {
            return self.fail(&err.to_string());
        }
        self.t.log(ADDED_MSG);
        self.snaps.events().register(TestEvent::Added);
    }

    fn update<F>(&self, report: &str, write: F)
    where
        F: FnOnce() -> Result<()>,
    {
        if !self.should_update() {
            return self.fail(report);
        }

        if let Err(err) = write() {
            return self.fail(&err.to_string());
        }
        self.t.log(UPDATED_MSG);
        self.snaps.events().register(TestEvent::Updated);
    }

    fn pass(&self) {
        self.snaps.events().register(TestEvent::Passed);
    }

    fn fail(&self, message: &str) {
        self.snaps.events().register(TestEvent::Erred);
        self.t.error(message);
    }
}

/// Whether both sides parse as JSON and are structurally equal.
fn json_equal(stored: &str, received: &str) -> bool {
    match (
        serde_json::from_str::<Value>(stored),
        serde_json::from_str::<Value>(received),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
