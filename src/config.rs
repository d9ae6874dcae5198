// Configuration file handling and sink selection

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::listener::TestSetListener;
use crate::report::{
    ConsoleOutputFileReporter, ConsoleOutputReceiver, ConsoleReporter, ConsoleStreams,
    ConsoleStyle, DirectConsoleOutput, FileReporter, Reporter, StatisticsReporter,
    StructuredReporter,
};
use crate::state::GlobalStatistics;

/// Console and file report verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[serde(alias = "BRIEF")]
    Brief,
    #[default]
    #[serde(alias = "PLAIN")]
    Plain,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brief" => Ok(Self::Brief),
            "plain" => Ok(Self::Plain),
            other => Err(Error::Config(format!(
                "unknown report format `{other}` (expected brief or plain)"
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Brief => "brief",
            ReportFormat::Plain => "plain",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Write a plain-text report file per test set
    #[serde(default = "default_true")]
    pub use_file: bool,

    /// Print set summaries on the console when reports go to files
    #[serde(default = "default_true")]
    pub print_summary: bool,

    /// Console and file verbosity
    #[serde(default)]
    pub report_format: ReportFormat,

    /// Send live test output to a file instead of the console
    #[serde(default)]
    pub redirect_output_to_file: bool,

    /// Skip the XML report
    #[serde(default)]
    pub disable_structured_report: bool,

    /// Target directory for file and XML reports
    #[serde(default = "default_reports_directory")]
    pub reports_directory: PathBuf,

    /// Only keep trace frames from the test's own source
    #[serde(default)]
    pub trim_stack_trace: bool,

    /// Disambiguates report files written concurrently
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_name_suffix: Option<String>,

    /// Record run history
    #[serde(default)]
    pub requires_run_history: bool,

    /// Names the run-history file
    #[serde(default = "default_configuration_hash")]
    pub configuration_hash: String,

    /// Properties written into the XML report
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            use_file: default_true(),
            print_summary: default_true(),
            report_format: ReportFormat::default(),
            redirect_output_to_file: false,
            disable_structured_report: false,
            reports_directory: default_reports_directory(),
            trim_stack_trace: false,
            report_name_suffix: None,
            requires_run_history: false,
            configuration_hash: default_configuration_hash(),
            properties: BTreeMap::new(),
        }
    }
}

// Default values
pub const CONFIG_FILE_NAME: &str = ".testcastrc.toml";

fn default_true() -> bool {
    true
}

pub fn default_reports_directory() -> PathBuf {
    PathBuf::from("./target/testcast-reports")
}

pub fn default_configuration_hash() -> String {
    String::from("TESTHASH")
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. .testcastrc.toml (current directory)
        // 2. ~/.testcastrc.toml (home directory)

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }

        paths
            .iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(path).ok())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }
}

/// Resolved, immutable report choices for one listener.
///
/// Builds exactly the subset of sinks the options ask for; disabled sinks are
/// never constructed.
#[derive(Debug, Clone)]
pub struct ReportConfiguration {
    options: ReportConfig,
    streams: ConsoleStreams,
}

impl ReportConfiguration {
    /// Resolve options against the process console streams
    pub fn new(options: ReportConfig) -> Self {
        Self::with_streams(options, ConsoleStreams::process())
    }

    pub fn with_streams(options: ReportConfig, streams: ConsoleStreams) -> Self {
        Self { options, streams }
    }

    /// File and summary on, plain format, XML enabled
    pub fn default_value() -> Self {
        Self::new(ReportConfig {
            reports_directory: PathBuf::from("./target"),
            ..ReportConfig::default()
        })
    }

    /// Like [`default_value`](Self::default_value) without the XML report
    pub fn default_no_structured() -> Self {
        Self::new(ReportConfig {
            reports_directory: PathBuf::from("./target"),
            disable_structured_report: true,
            configuration_hash: String::from("TESTHASHxXML"),
            ..ReportConfig::default()
        })
    }

    pub fn options(&self) -> &ReportConfig {
        &self.options
    }

    pub fn streams(&self) -> &ConsoleStreams {
        &self.streams
    }

    pub fn reports_directory(&self) -> &Path {
        &self.options.reports_directory
    }

    fn suffix(&self) -> Option<String> {
        self.options.report_name_suffix.clone()
    }

    pub fn structured_reporter(&self) -> Option<StructuredReporter> {
        if self.options.disable_structured_report {
            return None;
        }
        Some(StructuredReporter::new(
            self.options.reports_directory.clone(),
            self.suffix(),
            self.options.properties.clone(),
        ))
    }

    pub fn file_reporter(&self) -> Option<FileReporter> {
        self.options.use_file.then(|| {
            FileReporter::new(
                self.options.report_format,
                self.options.reports_directory.clone(),
                self.suffix(),
            )
        })
    }

    /// Console verbosity, if a console reporter is wanted at all
    pub fn console_style(&self) -> Option<ConsoleStyle> {
        let options = &self.options;
        if options.use_file {
            return options.print_summary.then_some(ConsoleStyle::Summary);
        }
        if options.redirect_output_to_file || options.report_format == ReportFormat::Brief {
            return Some(ConsoleStyle::Brief);
        }
        Some(ConsoleStyle::Detailed)
    }

    pub fn console_reporter(&self) -> Option<ConsoleReporter> {
        self.console_style()
            .map(|style| ConsoleReporter::new(style, self.streams.clone()))
    }

    /// Receiver for live test output; always present
    pub fn console_output_receiver(&self) -> Box<dyn ConsoleOutputReceiver> {
        if self.options.redirect_output_to_file {
            Box::new(ConsoleOutputFileReporter::new(
                self.options.reports_directory.clone(),
                self.suffix(),
            ))
        } else {
            Box::new(DirectConsoleOutput::new(self.streams.clone()))
        }
    }

    pub fn statistics_reporter(&self) -> Option<StatisticsReporter> {
        self.options
            .requires_run_history
            .then(|| StatisticsReporter::new(self.statistics_file()))
    }

    /// `<reports_dir>/../../.testcast-<hash>`, or inside the reports directory
    /// when it has no grandparent.
    pub fn statistics_file(&self) -> PathBuf {
        let dir = &self.options.reports_directory;
        let base = dir
            .parent()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(dir);
        base.join(format!(".testcast-{}", self.options.configuration_hash))
    }

    /// Active sinks in delivery order: console, file, XML, statistics
    pub fn reporters(&self) -> Vec<Box<dyn Reporter>> {
        let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
        if let Some(console) = self.console_reporter() {
            reporters.push(Box::new(console));
        }
        if let Some(file) = self.file_reporter() {
            reporters.push(Box::new(file));
        }
        if let Some(xml) = self.structured_reporter() {
            reporters.push(Box::new(xml));
        }
        if let Some(statistics) = self.statistics_reporter() {
            reporters.push(Box::new(statistics));
        }
        reporters
    }

    /// Build a listener wired to this configuration's sinks
    pub fn create_listener(&self, global: Arc<GlobalStatistics>) -> TestSetListener {
        TestSetListener::new(
            self.reporters(),
            self.console_output_receiver(),
            global,
            self.options.trim_stack_trace,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[report]
use_file = false
report_format = "brief"
redirect_output_to_file = true
reports_directory = "build/reports"
report_name_suffix = "fork-2"
requires_run_history = true
configuration_hash = "abc123"

[report.properties]
"os.name" = "linux"
"#;

        let config = Config::parse(toml).expect("Failed to parse config");
        let report = &config.report;
        assert!(!report.use_file);
        assert!(report.print_summary);
        assert_eq!(report.report_format, ReportFormat::Brief);
        assert!(report.redirect_output_to_file);
        assert_eq!(report.reports_directory, PathBuf::from("build/reports"));
        assert_eq!(report.report_name_suffix.as_deref(), Some("fork-2"));
        assert_eq!(report.configuration_hash, "abc123");
        assert_eq!(report.properties.get("os.name").map(String::as_str), Some("linux"));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let err = Config::parse("[report]\nreport_format = \"fancy\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_uppercase_format_alias() {
        let config = Config::parse("[report]\nreport_format = \"PLAIN\"\n").unwrap();
        assert_eq!(config.report.report_format, ReportFormat::Plain);
        assert_eq!("Brief".parse::<ReportFormat>().unwrap(), ReportFormat::Brief);
        assert!("xml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_to_toml_round_trips_options() {
        let config = Config::default();
        let parsed = Config::parse(&config.to_toml()).unwrap();
        assert_eq!(parsed.report, config.report);
    }

    #[test]
    fn test_statistics_file_location() {
        let nested = ReportConfiguration::new(ReportConfig {
            reports_directory: PathBuf::from("/work/project/target/reports"),
            configuration_hash: "h1".into(),
            ..ReportConfig::default()
        });
        assert_eq!(
            nested.statistics_file(),
            PathBuf::from("/work/project/.testcast-h1")
        );

        let shallow = ReportConfiguration::new(ReportConfig {
            reports_directory: PathBuf::from("reports"),
            configuration_hash: "h2".into(),
            ..ReportConfig::default()
        });
        assert_eq!(
            shallow.statistics_file(),
            PathBuf::from("reports").join(".testcast-h2")
        );
    }
}
