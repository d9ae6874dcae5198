// Report module - reporter sinks and fan-out

pub mod console;
pub mod file;
pub mod multicast;
pub mod output;
pub mod statistics;
pub mod xml;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use crate::state::{ReportEntry, SetDetail, TestStatus, format_elapsed};
pub use console::{ConsoleReporter, ConsoleStyle};
pub use file::FileReporter;
pub use multicast::MulticastReporter;
pub use output::{
    ConsoleOutputFileReporter, ConsoleOutputReceiver, ConsoleStreams, DirectConsoleOutput,
};
pub use statistics::StatisticsReporter;
pub use xml::StructuredReporter;

/// Reporter trait
///
/// Every sink sees the same event stream in the same order. Any method may be
/// a no-op; errors are contained by [`MulticastReporter`] and never reach the
/// other sinks.
pub trait Reporter: Send {
    /// Short identifier used in diagnostics
    fn name(&self) -> &'static str;

    /// Called when a test set starts
    fn on_set_starting(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    /// Called when a test set finishes, with its final detail
    fn on_set_completed(&mut self, _entry: &ReportEntry, _detail: &SetDetail) -> Result<()> {
        Ok(())
    }

    /// Called when a test starts
    fn on_test_starting(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn on_test_succeeded(&mut self, _entry: &ReportEntry, _detail: &SetDetail) -> Result<()> {
        Ok(())
    }

    /// Called for a failed test with the output it captured
    fn on_test_failed(
        &mut self,
        _entry: &ReportEntry,
        _stdout: &str,
        _stderr: &str,
        _detail: &SetDetail,
    ) -> Result<()> {
        Ok(())
    }

    /// Called for an errored test with the output it captured
    fn on_test_error(
        &mut self,
        _entry: &ReportEntry,
        _stdout: &str,
        _stderr: &str,
        _detail: &SetDetail,
    ) -> Result<()> {
        Ok(())
    }

    fn on_test_skipped(&mut self, _entry: &ReportEntry, _detail: &SetDetail) -> Result<()> {
        Ok(())
    }

    /// Free-form info line
    fn write_message(&mut self, _message: &str) -> Result<()> {
        Ok(())
    }

    /// Drop per-set state once a set is complete
    fn reset(&mut self) {}
}

/// `<dir>/<prefix><set>[-<suffix>]<ext>`
pub fn report_file(
    dir: &Path,
    prefix: &str,
    set: &str,
    suffix: Option<&str>,
    ext: &str,
) -> PathBuf {
    let mut file_name = format!("{prefix}{set}");
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        file_name.push('-');
        file_name.push_str(suffix);
    }
    file_name.push_str(ext);
    dir.join(file_name)
}

/// Elapsed time reported by the producer, or the one measured by the listener
pub fn test_elapsed(entry: &ReportEntry, detail: &SetDetail) -> Duration {
    entry
        .elapsed_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| detail.last_test_elapsed())
}

/// One report line for a concluded test, e.g.
/// `t2(SuiteA)  Time elapsed: 0.010 sec  <<< FAILURE!`
pub fn test_line(entry: &ReportEntry, status: TestStatus, elapsed: Duration) -> String {
    let mut line = format!("{}({})", entry.name, entry.source);
    if status == TestStatus::Skipped {
        line.push_str("  skipped");
    } else {
        line.push_str("  Time elapsed: ");
        line.push_str(&format_elapsed(elapsed));
    }
    if let Some(marker) = status.marker() {
        line.push_str("  ");
        line.push_str(marker);
    }
    line
}
