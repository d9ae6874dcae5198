pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod listener;
pub mod logging;
pub mod report;
pub mod state;

pub use capture::{CapturedOutput, OutputCapture, OutputChunk, Stream};
pub use config::{ReportConfig, ReportConfiguration, ReportFormat};
pub use error::{Error, Result};
pub use listener::{ListenerState, TestSetListener};
pub use state::{
    FailureDetail, GlobalStatistics, ReportEntry, RunResult, SetDetail, SetStatistics,
};
