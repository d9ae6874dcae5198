// Test set listener - the single entry point test producers report to

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::capture::{OutputCapture, OutputChunk, Stream};
use crate::error::{Error, Result};
use crate::report::{ConsoleOutputReceiver, MulticastReporter, Reporter};
use crate::state::{GlobalStatistics, ReportEntry, SetDetail, SetStatistics};

/// Lifecycle position of a [`TestSetListener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    SetActive,
    TestActive,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListenerState::Idle => "idle",
            ListenerState::SetActive => "inside a test set",
            ListenerState::TestActive => "running a test",
        })
    }
}

struct ListenerCore {
    state: ListenerState,
    detail: SetDetail,
    set_statistics: SetStatistics,
    reporters: MulticastReporter,
}

impl ListenerCore {
    fn expect(&self, operation: &'static str, allowed: &[ListenerState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::LifecycleViolation {
                operation,
                state: self.state,
            })
        }
    }
}

/// Reports the lifecycle of test sets to every configured sink.
///
/// One listener is reused for any number of sequential sets. Lifecycle calls
/// must come from one driving context at a time; [`write_test_output`] may be
/// called from any thread while a test is in flight, so the listener is
/// usually shared behind an `Arc`.
///
/// [`write_test_output`]: TestSetListener::write_test_output
pub struct TestSetListener {
    core: Mutex<ListenerCore>,
    capture: OutputCapture,
    // Mirrors `state == TestActive` for output writers, who never take the core lock
    test_active: AtomicBool,
    console_output: Mutex<Box<dyn ConsoleOutputReceiver>>,
    global: Arc<GlobalStatistics>,
}

impl TestSetListener {
    pub fn new(
        reporters: Vec<Box<dyn Reporter>>,
        console_output: Box<dyn ConsoleOutputReceiver>,
        global: Arc<GlobalStatistics>,
        trim_stack_trace: bool,
    ) -> Self {
        Self {
            core: Mutex::new(ListenerCore {
                state: ListenerState::Idle,
                detail: SetDetail::new(trim_stack_trace),
                set_statistics: SetStatistics::new(),
                reporters: MulticastReporter::new(reporters),
            }),
            capture: OutputCapture::new(),
            test_active: AtomicBool::new(false),
            console_output: Mutex::new(console_output),
            global,
        }
    }

    fn lock_core(&self) -> MutexGuard<'_, ListenerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forward_console<F>(&self, event: &'static str, deliver: F)
    where
        F: FnOnce(&mut dyn ConsoleOutputReceiver) -> anyhow::Result<()>,
    {
        let mut receiver = self
            .console_output
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = deliver(receiver.as_mut()) {
            error!(event, "Console output receiver failed: {:#}", err);
        }
    }

    pub fn state(&self) -> ListenerState {
        self.lock_core().state
    }

    /// Snapshot of the current set's detail
    pub fn set_detail(&self) -> SetDetail {
        self.lock_core().detail.clone()
    }

    /// Snapshot of the current set's statistics delta
    pub fn set_statistics(&self) -> SetStatistics {
        self.lock_core().set_statistics
    }

    pub fn global_statistics(&self) -> &Arc<GlobalStatistics> {
        &self.global
    }

    /// Reporter names in delivery order
    pub fn reporter_names(&self) -> Vec<&'static str> {
        self.lock_core().reporters.names()
    }

    /// Events a sink failed to handle so far
    pub fn delivery_failures(&self) -> usize {
        self.lock_core().reporters.delivery_failures()
    }

    /// Free-form info line for the sinks. Valid in any state.
    pub fn info(&self, message: &str) {
        self.lock_core().reporters.write_message(message);
    }

    /// Capture output for the in-flight test and stream it to the live console.
    ///
    /// Output arriving outside a test (startup noise, late background writes)
    /// is accepted as well and logged at `warn`.
    pub fn write_test_output(
        &self,
        buf: &[u8],
        offset: usize,
        length: usize,
        is_stdout: bool,
    ) -> Result<()> {
        let stream = Stream::from_is_stdout(is_stdout);
        let chunk = OutputChunk::copy_from(buf, offset, length, stream)?;
        if !self.test_active.load(Ordering::Acquire) {
            warn!(?stream, bytes = chunk.len(), "Test output received outside a running test");
        }
        self.forward_console("write_test_output", |receiver| {
            receiver.write_test_output(chunk.as_bytes(), stream)
        });
        self.capture.write(chunk);
        Ok(())
    }

    /// Convenience for textual output
    pub fn write_text(&self, text: &str, is_stdout: bool) -> Result<()> {
        self.write_test_output(text.as_bytes(), 0, text.len(), is_stdout)
    }

    pub fn test_set_starting(&self, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect(
            "test_set_starting",
            &[ListenerState::Idle, ListenerState::SetActive],
        )?;
        debug!(set = %entry.source, "Test set starting");

        core.detail.test_set_start();
        core.reporters.on_set_starting(entry);
        self.forward_console("test_set_starting", |receiver| {
            receiver.test_set_starting(entry)
        });
        core.state = ListenerState::SetActive;
        Ok(())
    }

    pub fn test_starting(&self, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect("test_starting", &[ListenerState::SetActive])?;
        debug!(set = %entry.source, test = %entry.name, "Test starting");

        core.detail.test_start();
        core.set_statistics.increment_started();
        core.reporters.on_test_starting(entry);
        core.state = ListenerState::TestActive;
        self.test_active.store(true, Ordering::Release);
        Ok(())
    }

    pub fn test_succeeded(&self, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect("test_succeeded", &[ListenerState::TestActive])?;
        let core = &mut *core;

        core.detail.test_end();
        core.set_statistics.increment_completed();
        core.reporters.on_test_succeeded(entry, &core.detail);
        self.capture.clear();
        core.state = ListenerState::SetActive;
        self.test_active.store(false, Ordering::Release);
        Ok(())
    }

    pub fn test_failed(&self, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect("test_failed", &[ListenerState::TestActive])?;
        let core = &mut *core;
        debug!(set = %entry.source, test = %entry.name, "Test failed");

        core.detail.increment_failure();
        core.detail.test_end();
        let output = self.capture.flatten_and_clear();
        core.reporters
            .on_test_failed(entry, &output.stdout, &output.stderr, &core.detail);
        core.set_statistics.increment_failure();
        core.set_statistics.increment_completed();
        self.global
            .add_failure_source(entry.name.clone(), entry.failure_summary());
        // Output written while the sinks were rendering this test is dropped, not
        // carried into the next test's report.
        self.capture.clear();
        core.state = ListenerState::SetActive;
        self.test_active.store(false, Ordering::Release);
        Ok(())
    }

    pub fn test_error(&self, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect("test_error", &[ListenerState::TestActive])?;
        let core = &mut *core;
        debug!(set = %entry.source, test = %entry.name, "Test errored");

        core.detail.increment_error();
        core.detail.test_end();
        let output = self.capture.flatten_and_clear();
        core.reporters
            .on_test_error(entry, &output.stdout, &output.stderr, &core.detail);
        core.set_statistics.increment_error();
        core.set_statistics.increment_completed();
        self.global
            .add_error_source(entry.name.clone(), entry.failure_summary());
        // Output written while the sinks were rendering this test is dropped, not
        // carried into the next test's report.
        self.capture.clear();
        core.state = ListenerState::SetActive;
        self.test_active.store(false, Ordering::Release);
        Ok(())
    }

    pub fn test_skipped(&self, entry: &ReportEntry) -> Result<()> {
        self.skip("test_skipped", entry)
    }

    /// An assumption failure counts as a skip.
    pub fn test_assumption_failure(&self, entry: &ReportEntry) -> Result<()> {
        self.skip("test_assumption_failure", entry)
    }

    fn skip(&self, operation: &'static str, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect(operation, &[ListenerState::TestActive])?;
        let core = &mut *core;

        core.detail.increment_skipped();
        core.detail.test_end();
        self.capture.clear();
        core.set_statistics.increment_skipped();
        core.set_statistics.increment_completed();
        core.reporters.on_test_skipped(entry, &core.detail);
        core.state = ListenerState::SetActive;
        self.test_active.store(false, Ordering::Release);
        Ok(())
    }

    pub fn test_set_completed(&self, entry: &ReportEntry) -> Result<()> {
        let mut core = self.lock_core();
        core.expect("test_set_completed", &[ListenerState::SetActive])?;
        let core = &mut *core;
        debug!(
            set = %entry.source,
            completed = core.detail.completed(),
            "Test set completed"
        );

        core.reporters.on_set_completed(entry, &core.detail);
        self.forward_console("test_set_completed", |receiver| {
            receiver.test_set_completed(entry)
        });
        core.detail.reset();
        core.reporters.reset();
        self.global.fold(&core.set_statistics);
        core.set_statistics.reset();
        core.state = ListenerState::Idle;
        Ok(())
    }
}

impl fmt::Debug for TestSetListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.lock_core();
        f.debug_struct("TestSetListener")
            .field("state", &core.state)
            .field("detail", &core.detail)
            .field("reporters", &core.reporters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DirectConsoleOutput;
    use crate::report::output::ConsoleStreams;

    fn listener() -> TestSetListener {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let streams = ConsoleStreams::new(sink.clone(), sink);
        TestSetListener::new(
            Vec::new(),
            Box::new(DirectConsoleOutput::new(streams)),
            Arc::new(GlobalStatistics::new()),
            false,
        )
    }

    #[test]
    fn test_state_transitions() {
        let listener = listener();
        let set = ReportEntry::for_set("SuiteA");
        let test = ReportEntry::new("SuiteA", "t1");
        assert_eq!(listener.state(), ListenerState::Idle);

        listener.test_set_starting(&set).unwrap();
        assert_eq!(listener.state(), ListenerState::SetActive);
        listener.test_starting(&test).unwrap();
        assert_eq!(listener.state(), ListenerState::TestActive);
        listener.test_succeeded(&test).unwrap();
        assert_eq!(listener.state(), ListenerState::SetActive);
        listener.test_set_completed(&set).unwrap();
        assert_eq!(listener.state(), ListenerState::Idle);
    }

    #[test]
    fn test_conclusion_without_start_is_rejected() {
        let listener = listener();
        listener
            .test_set_starting(&ReportEntry::for_set("SuiteA"))
            .unwrap();

        let err = listener
            .test_failed(&ReportEntry::new("SuiteA", "t1"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::LifecycleViolation {
                operation: "test_failed",
                state: ListenerState::SetActive
            }
        ));
        assert_eq!(listener.set_detail().failures(), 0);
        assert!(listener.global_statistics().failure_sources().is_empty());
    }

    #[test]
    fn test_nested_test_start_is_rejected() {
        let listener = listener();
        let test = ReportEntry::new("SuiteA", "t1");
        listener
            .test_set_starting(&ReportEntry::for_set("SuiteA"))
            .unwrap();
        listener.test_starting(&test).unwrap();

        assert!(listener.test_starting(&test).unwrap_err().is_lifecycle_violation());
        assert!(
            listener
                .test_set_completed(&ReportEntry::for_set("SuiteA"))
                .unwrap_err()
                .is_lifecycle_violation()
        );
        assert_eq!(listener.state(), ListenerState::TestActive);
    }

    #[test]
    fn test_startup_noise_is_tolerated() {
        let listener = listener();
        listener.write_text("booting\n", true).unwrap();
        listener.write_text("warming up\n", false).unwrap();
        assert_eq!(listener.state(), ListenerState::Idle);
    }

    #[test]
    fn test_bad_output_range_is_reported() {
        let listener = listener();
        let err = listener.write_test_output(b"abc", 1, 10, true).unwrap_err();
        assert!(matches!(err, Error::InvalidOutputRange { .. }));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_outside_test_is_warned() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let listener = listener();
            let test = ReportEntry::new("SuiteA", "t1");
            listener
                .test_set_starting(&ReportEntry::for_set("SuiteA"))
                .unwrap();
            listener.test_starting(&test).unwrap();
            listener.write_text("inside\n", true).unwrap();
            listener.test_succeeded(&test).unwrap();
            listener.write_text("after\n", false).unwrap();
        });

        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            logged
                .matches("Test output received outside a running test")
                .count(),
            1
        );
        assert!(logged.contains("Stderr"));
    }
}
