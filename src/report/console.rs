// Console reporter - per-set progress and summary output

use std::io::Write;

use anyhow::{Context, Result};

use super::output::ConsoleStreams;
use super::{Reporter, test_elapsed, test_line};
use crate::state::{ReportEntry, RunResult, SetDetail, TestStatus};

/// How much a console reporter prints per set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStyle {
    /// `Running <set>` and the set summary line only
    Summary,
    /// Summary plus the failing tests of the set
    Brief,
    /// A line for every test as it concludes
    Detailed,
}

/// Console reporter
pub struct ConsoleReporter {
    style: ConsoleStyle,
    streams: ConsoleStreams,
    failing: Vec<String>,
}

impl ConsoleReporter {
    /// Create new console reporter
    pub fn new(style: ConsoleStyle, streams: ConsoleStreams) -> Self {
        Self {
            style,
            streams,
            failing: Vec::new(),
        }
    }

    pub fn style(&self) -> ConsoleStyle {
        self.style
    }

    fn println(&self, line: &str) -> Result<()> {
        self.streams
            .println(line)
            .context("Failed to write console report")
    }

    fn concluded(
        &mut self,
        entry: &ReportEntry,
        status: TestStatus,
        detail: &SetDetail,
    ) -> Result<()> {
        let mut line = test_line(entry, status, test_elapsed(entry, detail));
        if matches!(status, TestStatus::Failure | TestStatus::Error) {
            if let Some(failure) = entry.render_failure(detail.trim_stack_trace()) {
                line.push('\n');
                line.push_str(&failure);
            }
        }

        match self.style {
            ConsoleStyle::Summary => Ok(()),
            ConsoleStyle::Detailed => self.println(&line),
            ConsoleStyle::Brief => {
                if status.marker().is_some() {
                    self.failing.push(line);
                }
                Ok(())
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn name(&self) -> &'static str {
        "console"
    }

    fn on_set_starting(&mut self, entry: &ReportEntry) -> Result<()> {
        self.println(&format!("Running {}", entry.source))
    }

    fn on_set_completed(&mut self, _entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.println(&detail.summary_line())?;
        for line in std::mem::take(&mut self.failing) {
            self.println(&line)?;
        }
        Ok(())
    }

    fn on_test_succeeded(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.concluded(entry, TestStatus::Success, detail)
    }

    fn on_test_failed(
        &mut self,
        entry: &ReportEntry,
        _stdout: &str,
        _stderr: &str,
        detail: &SetDetail,
    ) -> Result<()> {
        self.concluded(entry, TestStatus::Failure, detail)
    }

    fn on_test_error(
        &mut self,
        entry: &ReportEntry,
        _stdout: &str,
        _stderr: &str,
        detail: &SetDetail,
    ) -> Result<()> {
        self.concluded(entry, TestStatus::Error, detail)
    }

    fn on_test_skipped(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.concluded(entry, TestStatus::Skipped, detail)
    }

    fn write_message(&mut self, message: &str) -> Result<()> {
        self.println(message)
    }

    fn reset(&mut self) {
        self.failing.clear();
    }
}

/// Print the end-of-run summary: failing tests, errored tests and the totals.
pub fn print_run_summary(out: &mut dyn Write, result: &RunResult) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Results :")?;
    writeln!(out)?;

    if !result.failure_sources.is_empty() {
        writeln!(out, "Failed tests:")?;
        for source in &result.failure_sources {
            writeln!(out, "  {}: {}", source.name, source.detail)?;
        }
        writeln!(out)?;
    }

    if !result.error_sources.is_empty() {
        writeln!(out, "Tests in error:")?;
        for source in &result.error_sources {
            writeln!(out, "  {}: {}", source.name, source.detail)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", result.summary_line())?;
    writeln!(out)
}
