// Structured reporter - outputs each test set in JUnit XML format

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use super::{Reporter, report_file, test_elapsed};
use crate::state::{ReportEntry, SetDetail, TestStatus};

struct TestCase {
    name: String,
    classname: String,
    elapsed: Duration,
    status: TestStatus,
    kind: String,
    message: String,
    body: String,
    stdout: String,
    stderr: String,
}

/// Writes `<reports_dir>/TEST-<set>[-<suffix>].xml` when a set completes
pub struct StructuredReporter {
    reports_dir: PathBuf,
    suffix: Option<String>,
    properties: BTreeMap<String, String>,
    cases: Vec<TestCase>,
}

impl StructuredReporter {
    /// Create new structured reporter
    pub fn new(
        reports_dir: PathBuf,
        suffix: Option<String>,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            reports_dir,
            suffix,
            properties,
            cases: Vec::new(),
        }
    }

    /// Report path for the given set
    pub fn report_path(&self, set: &str) -> PathBuf {
        report_file(
            &self.reports_dir,
            "TEST-",
            set,
            self.suffix.as_deref(),
            ".xml",
        )
    }

    fn record(
        &mut self,
        entry: &ReportEntry,
        status: TestStatus,
        stdout: &str,
        stderr: &str,
        detail: &SetDetail,
    ) {
        let kind = entry
            .failure
            .as_ref()
            .map(|f| f.kind.clone())
            .unwrap_or_default();
        let body = if status.marker().is_some() {
            entry
                .render_failure(detail.trim_stack_trace())
                .unwrap_or_default()
        } else {
            String::new()
        };

        self.cases.push(TestCase {
            name: entry.name.clone(),
            classname: entry.source.clone(),
            elapsed: test_elapsed(entry, detail),
            status,
            kind,
            message: entry.failure_summary(),
            body,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    fn render(&self, entry: &ReportEntry, detail: &SetDetail) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuite name=\"{}\" time=\"{:.3}\" tests=\"{}\" errors=\"{}\" skipped=\"{}\" failures=\"{}\" timestamp=\"{}\">\n",
            escape(&entry.source),
            detail.elapsed_for_test_set().as_secs_f64(),
            detail.completed(),
            detail.errors(),
            detail.skipped(),
            detail.failures(),
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
        ));

        xml.push_str("  <properties>\n");
        for (name, value) in &self.properties {
            xml.push_str(&format!(
                "    <property name=\"{}\" value=\"{}\"/>\n",
                escape(name),
                escape(value)
            ));
        }
        xml.push_str("  </properties>\n");

        for case in &self.cases {
            xml.push_str(&format!(
                "  <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
                escape(&case.name),
                escape(&case.classname),
                case.elapsed.as_secs_f64()
            ));

            let element = match case.status {
                TestStatus::Success => {
                    xml.push_str("/>\n");
                    continue;
                }
                TestStatus::Skipped => {
                    xml.push_str(">\n    <skipped/>\n  </testcase>\n");
                    continue;
                }
                TestStatus::Failure => "failure",
                TestStatus::Error => "error",
            };

            xml.push_str(">\n");
            xml.push_str(&format!(
                "    <{} message=\"{}\" type=\"{}\">{}</{}>\n",
                element,
                escape(&case.message),
                escape(&case.kind),
                escape(&case.body),
                element
            ));
            if !case.stdout.is_empty() {
                xml.push_str(&format!(
                    "    <system-out>{}</system-out>\n",
                    escape(&case.stdout)
                ));
            }
            if !case.stderr.is_empty() {
                xml.push_str(&format!(
                    "    <system-err>{}</system-err>\n",
                    escape(&case.stderr)
                ));
            }
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

impl Reporter for StructuredReporter {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn on_set_starting(&mut self, _entry: &ReportEntry) -> Result<()> {
        self.cases.clear();
        Ok(())
    }

    fn on_set_completed(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        let xml = self.render(entry, detail);
        self.cases.clear();

        fs::create_dir_all(&self.reports_dir).with_context(|| {
            format!(
                "Failed to create reports directory: {}",
                self.reports_dir.display()
            )
        })?;

        let path = self.report_path(&entry.source);
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create XML report file: {}", path.display()))?;

        file.write_all(xml.as_bytes())
            .context("Failed to write XML report content")?;

        Ok(())
    }

    fn on_test_succeeded(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.record(entry, TestStatus::Success, "", "", detail);
        Ok(())
    }

    fn on_test_failed(
        &mut self,
        entry: &ReportEntry,
        stdout: &str,
        stderr: &str,
        detail: &SetDetail,
    ) -> Result<()> {
        self.record(entry, TestStatus::Failure, stdout, stderr, detail);
        Ok(())
    }

    fn on_test_error(
        &mut self,
        entry: &ReportEntry,
        stdout: &str,
        stderr: &str,
        detail: &SetDetail,
    ) -> Result<()> {
        self.record(entry, TestStatus::Error, stdout, stderr, detail);
        Ok(())
    }

    fn on_test_skipped(&mut self, entry: &ReportEntry, detail: &SetDetail) -> Result<()> {
        self.record(entry, TestStatus::Skipped, "", "", detail);
        Ok(())
    }

    fn reset(&mut self) {
        self.cases.clear();
    }
}

/// XML 1.0 escaping.
///
/// Characters the format cannot carry at all (C0 controls other than tab, LF
/// and CR, e.g. ANSI colour escapes in captured output) become U+FFFD.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => {
                escaped.push(char::REPLACEMENT_CHARACTER)
            }
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_ampersand_first() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_escape_replaces_control_characters() {
        assert_eq!(escape("\x1b[31mred\x1b[0m"), "\u{fffd}[31mred\u{fffd}[0m");
        assert_eq!(escape("a\0b"), "a\u{fffd}b");
        assert_eq!(escape("tab\tline\r\n"), "tab\tline\r\n");
    }

    #[test]
    fn test_report_path_prefix() {
        let reporter = StructuredReporter::new(PathBuf::from("out"), None, BTreeMap::new());
        assert_eq!(
            reporter.report_path("SuiteA"),
            PathBuf::from("out").join("TEST-SuiteA.xml")
        );
    }
}
