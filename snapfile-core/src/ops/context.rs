//! The shared state every snapshot call of a test binary goes through.

use std::fmt;
use std::sync::Arc;

use crate::helpers::caller::SourceLocation;
use crate::helpers::registry::{CallSites, Registry, StandaloneRegistry};
use crate::helpers::store::DEFAULT_ID_PREFIX;
use crate::ops::clean::{self, CleanReport};
use crate::ops::matcher::{Matcher, SKIPPED_MSG};
use crate::ops::skip::SkipTracker;
use crate::types::{CleanOptions, Config, Environment, Result, TestEvents, TestingT};

/// Occurrence registries, skip set and event counters shared by the match
/// calls of one test binary.
///
/// Build one per process and hand it to every call; tests of the engine
/// build their own to stay isolated.
#[derive(Debug)]
pub struct Snaps {
    registry: Arc<Registry>,
    standalone: Arc<StandaloneRegistry>,
    call_sites: CallSites,
    skips: SkipTracker,
    events: TestEvents,
    env: Environment,
    id_prefix: String,
}

impl Snaps {
    pub fn new(env: Environment) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            standalone: Arc::new(StandaloneRegistry::new()),
            call_sites: CallSites::new(),
            skips: SkipTracker::new(),
            events: TestEvents::new(),
            env,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }

    /// Prefix an entry id must start with to be recognized when shared
    /// files are reconciled. Defaults to `Test`.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn standalone_registry(&self) -> &Arc<StandaloneRegistry> {
        &self.standalone
    }

    /// Source files that called into each snapshot directory.
    pub fn call_sites(&self) -> &CallSites {
        &self.call_sites
    }

    pub fn skips(&self) -> &SkipTracker {
        &self.skips
    }

    pub fn events(&self) -> &TestEvents {
        &self.events
    }

    /// Matcher for one call site of the test `t`.
    pub fn matcher<'a>(
        &'a self,
        config: Config,
        t: &'a dyn TestingT,
        caller: SourceLocation,
    ) -> Matcher<'a> {
        let source = caller.file().to_path_buf();
        let matcher = Matcher::new(self, config, t, caller);
        self.call_sites.record(&matcher.snapshot_dir(), &source);
        matcher
    }

    /// Record that `t` skipped, so its snapshots are not reported obsolete.
    pub fn track_skip(&self, t: &dyn TestingT) {
        t.helper();
        t.log(SKIPPED_MSG);
        self.skips.add(t.name());
    }

    pub fn skip(&self, t: &dyn TestingT, message: &str) {
        self.track_skip(t);
        t.skip(message);
    }

    pub fn skipf(&self, t: &dyn TestingT, args: fmt::Arguments<'_>) {
        self.track_skip(t);
        t.skipf(args);
    }

    pub fn skip_now(&self, t: &dyn TestingT) {
        self.track_skip(t);
        t.skip_now();
    }

    /// Scan for obsolete snapshots, removing them in clean mode.
    pub fn clean(&self, opts: &CleanOptions) -> Result<CleanReport> {
        clean::clean(self, opts)
    }

    /// Forget every counter and skip record.
    pub fn reset(&self) {
        self.registry.clear();
        self.standalone.clear();
        self.call_sites.clear();
        self.skips.clear();
        self.events.reset();
    }
}

impl Default for Snaps {
    fn default() -> Self {
        Self::new(Environment::from_env())
    }
}
