// CLI argument definitions using Clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ReportConfig, ReportFormat};
use crate::error::Result;

/// Fan test lifecycle events out to console, file, XML and run-history reports
#[derive(Parser, Debug)]
#[command(name = "testcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Replay test lifecycle events through the configured report sinks",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a newline-delimited JSON event log
    Replay(ReplayArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReplayArgs {
    /// Event log to replay
    #[arg(required = true)]
    pub events: PathBuf,

    /// Directory for report files (overrides the configuration file)
    #[arg(long, value_name = "DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Report format: brief or plain
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Do not write per-set report files
    #[arg(long, default_value_t = false)]
    pub no_file: bool,

    /// Send live test output to files in the reports directory
    #[arg(long, default_value_t = false)]
    pub redirect_output: bool,

    /// Do not write XML reports
    #[arg(long, default_value_t = false)]
    pub no_xml: bool,

    /// Record run history
    #[arg(long, default_value_t = false)]
    pub run_history: bool,

    /// Keep only trace frames from the test's own source
    #[arg(long, default_value_t = false)]
    pub trim_stack_trace: bool,

    /// Suffix appended to report file names
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,
}

impl ReplayArgs {
    /// Layer command-line flags over file configuration.
    pub fn apply(&self, options: &mut ReportConfig) -> Result<()> {
        if let Some(dir) = &self.reports_dir {
            options.reports_directory = dir.clone();
        }
        if let Some(format) = &self.format {
            options.report_format = format.parse::<ReportFormat>()?;
        }
        if self.no_file {
            options.use_file = false;
        }
        if self.redirect_output {
            options.redirect_output_to_file = true;
        }
        if self.no_xml {
            options.disable_structured_report = true;
        }
        if self.run_history {
            options.requires_run_history = true;
        }
        if self.trim_stack_trace {
            options.trim_stack_trace = true;
        }
        if let Some(suffix) = &self.suffix {
            options.report_name_suffix = Some(suffix.clone());
        }
        Ok(())
    }
}
