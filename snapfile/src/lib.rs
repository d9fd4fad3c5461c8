//! Snapshot assertions for the standard test harness.
//!
//! ```ignore
//! #[test]
//! fn renders_user() {
//!     snapfile::assert_snapshot!(10, "hello world");
//!     snapfile::assert_json_snapshot!(user, snapfile::Any::new(["created"]));
//! }
//! ```
//!
//! The first run writes `__snapshots__/<test file>.snap` next to the test
//! source; later runs compare against it. Set `UPDATE_SNAPS=true` to
//! rewrite mismatching snapshots, `UPDATE_SNAPS=clean` to also remove
//! obsolete ones when [`clean`] runs. On CI nothing is ever written.
//!
//! Every call site is identified by the test name (the libtest thread name,
//! `::` replaced by `/`) and a per-test occurrence number.

use std::cell::RefCell;
use std::fmt;
use std::sync::Mutex;

use once_cell::sync::Lazy;

pub use snapfile_core::{
    summary, Any, CleanOptions, CleanReport, Config, Custom, Environment, JsonInput, JsonKind,
    JsonMatcher, Matcher, Pretty, Result, SnapError, Snaps, SnapshotValue, SourceLocation,
    TestEvent, TestingT, Type,
};

/// Rust test names carry no fixed prefix, so shared-file entries are
/// recognized by their ` - N` suffix alone.
const ID_PREFIX: &str = "";

static SNAPS: Lazy<Snaps> =
    Lazy::new(|| Snaps::new(Environment::from_env()).with_id_prefix(ID_PREFIX));

/// The context shared by every assertion in this test binary.
pub fn snaps() -> &'static Snaps {
    &SNAPS
}

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// Cleanups of the test running on this thread. libtest runs each test on
/// its own thread, so they fire when the test finishes.
#[derive(Default)]
struct TestScope {
    cleanups: RefCell<Vec<Cleanup>>,
}

impl Drop for TestScope {
    fn drop(&mut self) {
        for f in self.cleanups.get_mut().drain(..).rev() {
            f();
        }
    }
}

thread_local! {
    static SCOPE: TestScope = TestScope::default();
}

/// [`TestingT`] for a test run by libtest.
///
/// Failures are collected and raised together by [`LibTest::finish`].
#[derive(Debug)]
pub struct LibTest {
    name: String,
    errors: Mutex<Vec<String>>,
}

impl LibTest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// The test running on this thread. `fallback` names it when the
    /// thread carries no test name.
    pub fn current(fallback: &str) -> Self {
        let thread = std::thread::current();
        let name = match thread.name() {
            Some(name) if name != "main" => name,
            _ => fallback,
        };
        Self::new(name.replace("::", "/"))
    }

    /// Panic with every reported failure, if any.
    pub fn finish(self) {
        let errors = self.errors.into_inner().unwrap_or_else(|e| e.into_inner());
        if !errors.is_empty() {
            panic!("{}", errors.join("\n"));
        }
    }
}

impl TestingT for LibTest {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn log(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }

    fn cleanup(&self, f: Cleanup) {
        let pending = SCOPE.try_with(|scope| scope.cleanups.borrow_mut().push(f));
        if pending.is_err() {
            log::warn!("Test {} is finishing, cleanup dropped", self.name);
        }
    }

    fn skip(&self, message: &str) {
        println!("skipped {}: {}", self.name, message);
    }

    fn skip_now(&self) {
        println!("skipped {}", self.name);
    }
}

/// Scan for obsolete snapshots and print the summary.
///
/// Call once, after every other test of the binary finished, e.g. from a
/// custom harness (`harness = false`).
pub fn clean(opts: &CleanOptions) -> Result<CleanReport> {
    let report = snaps().clean(opts)?;
    let text = summary(&report);
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(report)
}

#[doc(hidden)]
pub mod __private {
    use super::*;

    /// Call site captured by the macros.
    pub struct Site {
        pub file: &'static str,
        pub manifest_dir: &'static str,
        pub module_path: &'static str,
    }

    pub fn run<F>(site: Site, config: Config, f: F)
    where
        F: FnOnce(&Matcher<'_>),
    {
        let t = LibTest::current(site.module_path);
        let caller = SourceLocation::resolve(site.file, site.manifest_dir);
        f(&snaps().matcher(config, &t, caller));
        t.finish();
    }

    pub fn skip(module_path: &str, args: fmt::Arguments<'_>) {
        let t = LibTest::current(module_path);
        snaps().skipf(&t, args);
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __site {
    () => {
        $crate::__private::Site {
            file: file!(),
            manifest_dir: env!("CARGO_MANIFEST_DIR"),
            module_path: module_path!(),
        }
    };
}

/// Compare values with this call's entry in `<test file>.snap`.
///
/// ```ignore
/// assert_snapshot!(10, "hello world");
/// assert_snapshot!(config = Config::default().filename("users"); user_count);
/// ```
#[macro_export]
macro_rules! assert_snapshot {
    (config = $config:expr; $($value:expr),* $(,)?) => {
        $crate::__private::run($crate::__site!(), $config, |m| {
            m.match_snapshot(&[$(&$value as &dyn $crate::SnapshotValue),*])
        })
    };
    ($($value:expr),* $(,)?) => {
        $crate::assert_snapshot!(config = $crate::Config::default(); $($value),*)
    };
}

/// Compare a value with its own snapshot file, `<test name>_<N>.snap`.
#[macro_export]
macro_rules! assert_standalone_snapshot {
    (config = $config:expr; $value:expr $(,)?) => {
        $crate::__private::run($crate::__site!(), $config, |m| {
            m.match_standalone_snapshot(&$value as &dyn $crate::SnapshotValue)
        })
    };
    ($value:expr $(,)?) => {
        $crate::assert_standalone_snapshot!(config = $crate::Config::default(); $value)
    };
}

/// Compare a JSON document with this call's entry in `<test file>.snap`.
///
/// The value is converted with serde; `raw = text` takes JSON text as is.
/// Matchers after the value run on the document first.
///
/// ```ignore
/// assert_json_snapshot!(user, Any::new(["created"]));
/// assert_json_snapshot!(raw = r#"{"id": 1}"#);
/// ```
#[macro_export]
macro_rules! assert_json_snapshot {
    (config = $config:expr; raw = $input:expr $(, $matcher:expr)* $(,)?) => {
        $crate::__private::run($crate::__site!(), $config, |m| {
            m.match_json(
                $crate::JsonInput::raw(&$input),
                &[$(&$matcher as &dyn $crate::JsonMatcher),*],
            )
        })
    };
    (config = $config:expr; $value:expr $(, $matcher:expr)* $(,)?) => {
        $crate::__private::run($crate::__site!(), $config, |m| {
            m.match_json(
                $crate::JsonInput::serialize(&$value),
                &[$(&$matcher as &dyn $crate::JsonMatcher),*],
            )
        })
    };
    (raw = $input:expr $(, $matcher:expr)* $(,)?) => {
        $crate::assert_json_snapshot!(
            config = $crate::Config::default(); raw = $input $(, $matcher)*
        )
    };
    ($value:expr $(, $matcher:expr)* $(,)?) => {
        $crate::assert_json_snapshot!(config = $crate::Config::default(); $value $(, $matcher)*)
    };
}

/// Skip the current test, keeping its snapshots from being reported as
/// obsolete. Returns from the enclosing function.
#[macro_export]
macro_rules! skip_snapshot {
    () => {{
        $crate::__private::skip(module_path!(), format_args!(""));
        return;
    }};
    ($($arg:tt)+) => {{
        $crate::__private::skip(module_path!(), format_args!($($arg)+));
        return;
    }};
}
