use std::path::PathBuf;

use testcast::config::{CONFIG_FILE_NAME, Config};
use testcast::{ReportConfiguration, ReportFormat};

#[test]
fn test_default_config_values() {
    let config = Config::default();
    let report = &config.report;

    assert!(report.use_file);
    assert!(report.print_summary);
    assert_eq!(report.report_format, ReportFormat::Plain);
    assert!(!report.redirect_output_to_file);
    assert!(!report.disable_structured_report);
    assert!(!report.trim_stack_trace);
    assert!(!report.requires_run_history);
    assert_eq!(report.report_name_suffix, None);
    assert_eq!(report.reports_directory, PathBuf::from("./target/testcast-reports"));
    assert_eq!(report.configuration_hash, "TESTHASH");
    assert!(report.properties.is_empty());
}

#[test]
fn test_empty_file_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.report, Config::default().report);
}

#[test]
fn test_presets_report_into_target() {
    let with_xml = ReportConfiguration::default_value();
    let without_xml = ReportConfiguration::default_no_structured();

    assert_eq!(with_xml.reports_directory(), PathBuf::from("./target"));
    assert_eq!(with_xml.options().configuration_hash, "TESTHASH");
    assert!(with_xml.structured_reporter().is_some());
    assert!(without_xml.structured_reporter().is_none());
    assert_eq!(without_xml.reports_directory(), with_xml.reports_directory());
}

#[test]
fn test_load_from_file() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[report]\nprint_summary = false\n").unwrap();

    let config = Config::load_from_file(&path).unwrap();

    assert!(!config.report.print_summary);
    assert!(config.report.use_file);
}
