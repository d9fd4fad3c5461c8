//! Per-process outcome counters for the final summary.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// Outcome of a single match call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestEvent {
    /// The call failed: diff, missing snapshot on CI, I/O or input error.
    Erred,
    /// A new snapshot was written.
    Added,
    /// An existing snapshot was rewritten in update mode.
    Updated,
    /// The stored snapshot matched.
    Passed,
}

/// Counters for [`TestEvent`]s. Match calls may run on parallel test
/// threads, so every update goes through the mutex.
#[derive(Debug, Default)]
pub struct TestEvents {
    items: Mutex<HashMap<TestEvent, usize>>,
}

impl TestEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for `event`.
    pub fn register(&self, event: TestEvent) {
        *self.lock().entry(event).or_insert(0) += 1;
    }

    /// Current count for `event`.
    pub fn get(&self, event: TestEvent) -> usize {
        self.lock().get(&event).copied().unwrap_or(0)
    }

    /// Copy of all counters.
    pub fn snapshot(&self) -> HashMap<TestEvent, usize> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values().all(|count| *count == 0)
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TestEvent, usize>> {
        // A panicking test thread must not take the counters down with it.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}
