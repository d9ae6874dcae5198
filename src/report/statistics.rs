// Statistics reporter - appends per-test results to the run-history file

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use super::{Reporter, test_elapsed};
use crate::state::{ReportEntry, SetDetail, TestStatus};

/// One line of run history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub status: TestStatus,
    pub elapsed: Duration,
    pub set: String,
    pub test: String,
}

impl HistoryRecord {
    /// `<status>,<elapsed_ms>,<set>,<test>`
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.status,
            self.elapsed.as_millis(),
            self.set,
            self.test
        )
    }

    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(4, ',');
        let status = match parts.next()? {
            "success" => TestStatus::Success,
            "failure" => TestStatus::Failure,
            "error" => TestStatus::Error,
            "skipped" => TestStatus::Skipped,
            _ => return None,
        };
        let elapsed = Duration::from_millis(parts.next()?.parse().ok()?);
        Some(Self {
            status,
            elapsed,
            set: parts.next()?.to_string(),
            test: parts.next()?.to_string(),
        })
    }
}

/// Records every concluded test and persists the set's records when it completes
pub struct StatisticsReporter {
    path: PathBuf,
    pending: Vec<HistoryRecord>,
}

impl StatisticsReporter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read back every record persisted so far
    pub fn load(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read run history: {}", self.path.display()))?;
        Ok(content.lines().filter_map(HistoryRecord::parse).collect())
    }

    fn record(&mut self, entry: &ReportEntry, status: TestStatus, detail: &SetDetail) {
        self.pending.push(HistoryRecord {
            status,
            elapsed: test_elapsed(entry, detail),
            set: entry.source.clone(),
            test: entry.name.clone(),
        });
    }
}

impl Reporter for StatisticsReporter {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn on_set_completed(&mut self, _entry: &ReportEntry, _detail: &SetDetail) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create run history directory: {}", parent.display())
            })?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open run history: {}", self.path.display()))?;

        let mut lines = String::new();
        for record in self.pending.drain(..) {
            lines.push_str(&record.to_line());
            lines.push('\n');
        }
        file.write_all(lines.as_bytes())
            .context("Failed to append run history")?;
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
        self.pending.clear();
    }
}
