// Set and run statistics

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Per-set delta folded into [`GlobalStatistics`] when the set completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SetStatistics {
    pub started: usize,
    pub completed: usize,
    pub errors: usize,
    pub failures: usize,
    pub skipped: usize,
}

impl SetStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_started(&mut self) {
        self.started += 1;
    }

    pub fn increment_completed(&mut self) {
        self.completed += 1;
    }

    pub fn increment_error(&mut self) {
        self.errors += 1;
    }

    pub fn increment_failure(&mut self) {
        self.failures += 1;
    }

    pub fn increment_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A failed or errored test and its short failure description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub name: String,
    pub detail: String,
}

/// Snapshot of the run totals, used for the final summary and exit status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub sets: usize,
    pub started: usize,
    pub completed: usize,
    pub errors: usize,
    pub failures: usize,
    pub skipped: usize,
    pub failure_sources: Vec<SourceRecord>,
    pub error_sources: Vec<SourceRecord>,
}

impl RunResult {
    pub fn had_failures(&self) -> bool {
        self.errors + self.failures > 0
            || !self.failure_sources.is_empty()
            || !self.error_sources.is_empty()
    }

    /// Process exit status for the run: zero only when nothing failed or errored
    pub fn exit_code(&self) -> i32 {
        if self.had_failures() { 1 } else { 0 }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Tests run: {}, Failures: {}, Errors: {}, Skipped: {}",
            self.completed, self.failures, self.errors, self.skipped
        )
    }
}

/// Lifetime statistics of a run, shared by every concurrently active listener.
///
/// All methods take `&self`; a single mutex guards the totals so a fold and a
/// source record from different sets never interleave halfway.
#[derive(Debug, Default)]
pub struct GlobalStatistics {
    totals: Mutex<RunResult>,
}

impl GlobalStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RunResult> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a completed set's delta to the run totals.
    pub fn fold(&self, set: &SetStatistics) {
        let mut totals = self.lock();
        totals.sets += 1;
        totals.started += set.started;
        totals.completed += set.completed;
        totals.errors += set.errors;
        totals.failures += set.failures;
        totals.skipped += set.skipped;
    }

    // Single-test counters for producers that report outside a listener. They
    // only ever add to the run totals.

    pub fn increment_started(&self) {
        self.lock().started += 1;
    }

    pub fn increment_completed(&self) {
        self.lock().completed += 1;
    }

    pub fn increment_error(&self) {
        self.lock().errors += 1;
    }

    pub fn increment_failure(&self) {
        self.lock().failures += 1;
    }

    pub fn increment_skipped(&self) {
        self.lock().skipped += 1;
    }

    /// Record a failed test. A repeated name (e.g. a rerun) replaces the earlier detail.
    pub fn add_failure_source(&self, name: impl Into<String>, detail: impl Into<String>) {
        upsert(&mut self.lock().failure_sources, name.into(), detail.into());
    }

    /// Record an errored test. A repeated name replaces the earlier detail.
    pub fn add_error_source(&self, name: impl Into<String>, detail: impl Into<String>) {
        upsert(&mut self.lock().error_sources, name.into(), detail.into());
    }

    pub fn failure_sources(&self) -> Vec<SourceRecord> {
        self.lock().failure_sources.clone()
    }

    pub fn error_sources(&self) -> Vec<SourceRecord> {
        self.lock().error_sources.clone()
    }

    pub fn failure_source(&self, name: &str) -> Option<String> {
        find(&self.lock().failure_sources, name)
    }

    pub fn error_source(&self, name: &str) -> Option<String> {
        find(&self.lock().error_sources, name)
    }

    pub fn had_failures(&self) -> bool {
        self.lock().had_failures()
    }

    pub fn summary(&self) -> RunResult {
        self.lock().clone()
    }

    /// Begin a new run. Within a run the totals only grow; this is the one
    /// place they return to zero.
    pub fn reset(&self) {
        *self.lock() = RunResult::default();
    }
}

fn upsert(records: &mut Vec<SourceRecord>, name: String, detail: String) {
    match records.iter_mut().find(|r| r.name == name) {
        Some(existing) => existing.detail = detail,
        None => records.push(SourceRecord { name, detail }),
    }
}

fn find(records: &[SourceRecord], name: &str) -> Option<String> {
    records
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.detail.clone())
}
