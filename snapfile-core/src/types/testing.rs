//! The test context a snapshot call runs inside.

use std::fmt;

/// Capabilities the host test framework provides to a snapshot call.
///
/// The standard harness has no object for this, so `snapfile` builds one per
/// call; tests of the engine use a mock.
pub trait TestingT {
    /// Mark the current frame as a helper. No-op unless the host tracks it.
    fn helper(&self) {}

    /// Hierarchical name of the running test, e.g. `parent/child`.
    fn name(&self) -> String;

    /// Print a message attached to the running test.
    fn log(&self, message: &str);

    /// Report a failure. The test continues; the host decides when it fails.
    fn error(&self, message: &str);

    /// Run `f` when the running test finishes.
    fn cleanup(&self, f: Box<dyn FnOnce() + Send + 'static>);

    /// Skip the running test with a message.
    fn skip(&self, message: &str);

    /// Skip the running test with a formatted message.
    fn skipf(&self, args: fmt::Arguments<'_>) {
        self.skip(&args.to_string());
    }

    /// Skip the running test without a message.
    fn skip_now(&self);
}
