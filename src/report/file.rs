// File reporter - one plain-text report per test set

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{Reporter, report_file, test_elapsed, test_line};
use crate::config::ReportFormat;
use crate::state::{ReportEntry, SetDetail, TestStatus};

const RULE: &str =
    "-------------------------------------------------------------------------------";

/// Writes `<reports_dir>/<set>[-<suffix>].txt` when a set completes.
///
/// `plain` lists every test; `brief` only the ones that failed or errored.
pub struct FileReporter {
    format: ReportFormat,
    reports_dir: PathBuf,
    suffix: Option<String>,
    lines: Vec<String>,
}

impl FileReporter {
    pub fn new(format: ReportFormat, reports_dir: PathBuf, suffix: Option<String>) -> Self {
        Self {
            format,
            reports_dir,
            suffix,
            lines: Vec::new(),
        }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Report path for the given set
    pub fn report_path(&self, set: &str) -> PathBuf {
        report_file(&self.reports_dir, "", set, self.suffix.as_deref(), ".txt")
    }

    fn record(&mut self, entry: &ReportEntry, status: TestStatus, detail: &SetDetail) {
        let listed = match self.format {
            ReportFormat::Plain => true,
            ReportFormat::Brief => status.marker().is_some(),
        };
        if !listed {
            return;
        }

        self.lines
            .push(test_line(entry, status, test_elapsed(entry, detail)));
        if status.marker().is_some() {
            if let Some(failure) = entry.render_failure(detail.trim_stack_trace()) {
                self.lines.push(failure);
                self.lines.push(String::new());
            }
        }
    }
}

impl Reporter for FileReporter {
    fn name(&self) -> &'static str {
        "file"
    }

    fn on_set_starting(&mut self, _entry: &ReportEntry) -> Result<()> {
        self.lines.clear();
        Ok(())
    }

    fn on_set_completed(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        let mut report = String::new();
        report.push_str(RULE);
        report.push('\n');
        report.push_str(&format!("Test set: {}\n", entry.source));
        report.push_str(RULE);
        report.push('\n');
        report.push_str(&detail.summary_line());
        report.push('\n');
        for line in self.lines.drain(..) {
            report.push_str(&line);
            report.push('\n');
        }

        fs::create_dir_all(&self.reports_dir).with_context(|| {
            format!(
                "Failed to create reports directory: {}",
                self.reports_dir.display()
            )
        })?;
        let path = self.report_path(&entry.source);
        fs::write(&path, report)
            .with_context(|| format!("Failed to write report file: {}", path.display()))?;
        Ok(())
    }

    fn on_test_succeeded(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.record(entry, TestStatus::Success, detail);
        Ok(())
    }

    fn on_test_failed(
        &mut self,
        entry: &ReportEntry,
        _stdout: &str,
        _stderr: &str,
        detail: &SetDetail,
    ) -> Result<()> {
        self.record(entry, TestStatus::Failure, detail);
        Ok(())
    }

    fn on_test_error(
        &mut self,
        entry: &ReportEntry,
        _stdout: &str,
        _stderr: &str,
        detail: &SetDetail,
    ) -> Result<()> {
        self.record(entry, TestStatus::Error, detail);
        Ok(())
    }

    fn on_test_skipped(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.record(entry, TestStatus::Skipped, detail);
        Ok(())
    }

    fn reset(&mut self) {
        self.lines.clear();
    }
}
