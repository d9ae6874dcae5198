// State module - entries and counters
// Per-set detail, per-set statistics delta and run-wide statistics

pub mod detail;
pub mod entry;
pub mod statistics;

pub use detail::{SetDetail, format_elapsed};
pub use entry::{FailureDetail, ReportEntry};
pub use statistics::{GlobalStatistics, RunResult, SetStatistics, SourceRecord};

use serde::{Deserialize, Serialize};

/// Outcome of a concluded test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Failure,
    Error,
    Skipped,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Success => "success",
            TestStatus::Failure => "failure",
            TestStatus::Error => "error",
            TestStatus::Skipped => "skipped",
        }
    }

    /// Marker appended to report lines of tests that did not pass
    pub fn marker(self) -> Option<&'static str> {
        match self {
            TestStatus::Failure => Some("<<< FAILURE!"),
            TestStatus::Error => Some("<<< ERROR!"),
            TestStatus::Success | TestStatus::Skipped => None,
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
