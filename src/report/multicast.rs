// Multicast reporter - forwards every event to each configured sink

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;

use super::Reporter;
use crate::state::{ReportEntry, SetDetail};

/// Ordered fan-out over the active reporters.
///
/// Disabled sinks are simply absent from the list. A sink that returns an
/// error or panics is logged and skipped for that event; the remaining sinks
/// still receive it.
pub struct MulticastReporter {
    reporters: Vec<Box<dyn Reporter>>,
    delivery_failures: usize,
}

impl MulticastReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self {
            reporters,
            delivery_failures: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Reporter names in delivery order
    pub fn names(&self) -> Vec<&'static str> {
        self.reporters.iter().map(|r| r.name()).collect()
    }

    /// Number of events a sink failed to handle so far
    pub fn delivery_failures(&self) -> usize {
        self.delivery_failures
    }

    fn dispatch<F>(&mut self, event: &'static str, mut deliver: F)
    where
        F: FnMut(&mut dyn Reporter) -> anyhow::Result<()>,
    {
        for reporter in &mut self.reporters {
            let name = reporter.name();
            match catch_unwind(AssertUnwindSafe(|| deliver(reporter.as_mut()))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.delivery_failures += 1;
                    error!(reporter = name, event, "Reporter failed: {:#}", err);
                }
                Err(_) => {
                    self.delivery_failures += 1;
                    error!(reporter = name, event, "Reporter panicked");
                }
            }
        }
    }

    pub fn on_set_starting(&mut self, entry: &ReportEntry) {
        self.dispatch("set_starting", |r| r.on_set_starting(entry));
    }

    pub fn on_set_completed(&mut self, entry: &ReportEntry, detail: &SetDetail) {
        self.dispatch("set_completed", |r| r.on_set_completed(entry, detail));
    }

    pub fn on_test_starting(&mut self, entry: &ReportEntry) {
        self.dispatch("test_starting", |r| r.on_test_starting(entry));
    }

    pub fn on_test_succeeded(&mut self, entry: &ReportEntry, detail: &SetDetail) {
        self.dispatch("test_succeeded", |r| r.on_test_succeeded(entry, detail));
    }

    pub fn on_test_failed(
        &mut self,
        entry: &ReportEntry,
        stdout: &str,
        stderr: &str,
        detail: &SetDetail,
    ) {
        self.dispatch("test_failed", |r| {
            r.on_test_failed(entry, stdout, stderr, detail)
        });
    }

    pub fn on_test_error(
        &mut self,
        entry: &ReportEntry,
        stdout: &str,
        stderr: &str,
        detail: &SetDetail,
    ) {
        self.dispatch("test_error", |r| {
            r.on_test_error(entry, stdout, stderr, detail)
        });
    }

    pub fn on_test_skipped(&mut self, entry: &ReportEntry, detail: &SetDetail) {
        self.dispatch("test_skipped", |r| r.on_test_skipped(entry, detail));
    }

    pub fn write_message(&mut self, message: &str) {
        self.dispatch("write_message", |r| r.write_message(message));
    }

    pub fn reset(&mut self) {
        self.dispatch("reset", |r| {
            r.reset();
            Ok(())
        });
    }
}

impl std::fmt::Debug for MulticastReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MulticastReporter")
            .field("reporters", &self.names())
            .field("delivery_failures", &self.delivery_failures)
            .finish()
    }
}
