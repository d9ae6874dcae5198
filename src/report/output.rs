// Live test output - console streams and the output-to-file receiver

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

use super::report_file;
use crate::capture::Stream;
use crate::state::ReportEntry;

/// Shared handle to a writable console stream
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// The process's original console streams, passed explicitly to the sinks
/// that write live output.
#[derive(Clone)]
pub struct ConsoleStreams {
    out: SharedWriter,
    err: SharedWriter,
}

impl ConsoleStreams {
    pub fn new(out: SharedWriter, err: SharedWriter) -> Self {
        Self { out, err }
    }

    /// Process stdout and stderr
    pub fn process() -> Self {
        Self::new(
            Arc::new(Mutex::new(io::stdout())),
            Arc::new(Mutex::new(io::stderr())),
        )
    }

    pub fn out(&self) -> &SharedWriter {
        &self.out
    }

    pub fn err(&self) -> &SharedWriter {
        &self.err
    }

    pub fn for_stream(&self, stream: Stream) -> &SharedWriter {
        match stream {
            Stream::Stdout => &self.out,
            Stream::Stderr => &self.err,
        }
    }

    /// Write one line to the out stream.
    pub fn println(&self, line: &str) -> io::Result<()> {
        write_to(&self.out, format!("{line}\n").as_bytes())
    }
}

impl Default for ConsoleStreams {
    fn default() -> Self {
        Self::process()
    }
}

impl std::fmt::Debug for ConsoleStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleStreams").finish_non_exhaustive()
    }
}

pub(crate) fn write_to(writer: &SharedWriter, bytes: &[u8]) -> io::Result<()> {
    let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
    guard.write_all(bytes)?;
    guard.flush()
}

/// Receives raw test output as it is produced, independent of outcome
pub trait ConsoleOutputReceiver: Send {
    fn test_set_starting(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn test_set_completed(&mut self, _entry: &ReportEntry) -> Result<()> {
        Ok(())
    }

    fn write_test_output(&mut self, bytes: &[u8], stream: Stream) -> Result<()>;
}

/// Streams test output straight to the original console
#[derive(Debug, Clone, Default)]
pub struct DirectConsoleOutput {
    streams: ConsoleStreams,
}

impl DirectConsoleOutput {
    pub fn new(streams: ConsoleStreams) -> Self {
        Self { streams }
    }
}

impl ConsoleOutputReceiver for DirectConsoleOutput {
    fn write_test_output(&mut self, bytes: &[u8], stream: Stream) -> Result<()> {
        write_to(self.streams.for_stream(stream), bytes)
            .with_context(|| format!("Failed to write test output to {stream:?}"))
    }
}

/// Redirects test output to `<reports_dir>/<set>[-<suffix>]-output.txt`.
///
/// The file is only created once a set actually produces output and is
/// closed when the set completes. Output arriving after completion is appended
/// to the file of the set that just finished; only output written before the
/// first set goes to `startup[-<suffix>]-output.txt`.
#[derive(Debug)]
pub struct ConsoleOutputFileReporter {
    reports_dir: PathBuf,
    suffix: Option<String>,
    current_set: Option<String>,
    file: Option<BufWriter<File>>,
}

impl ConsoleOutputFileReporter {
    pub fn new(reports_dir: PathBuf, suffix: Option<String>) -> Self {
        Self {
            reports_dir,
            suffix,
            current_set: None,
            file: None,
        }
    }

    /// Output file for the current or most recently completed set
    pub fn output_path(&self) -> PathBuf {
        let set = self.current_set.as_deref().unwrap_or("startup");
        report_file(
            &self.reports_dir,
            "",
            set,
            self.suffix.as_deref(),
            "-output.txt",
        )
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().context("Failed to flush test output file")?;
        }
        Ok(())
    }
}

impl ConsoleOutputReceiver for ConsoleOutputFileReporter {
    fn test_set_starting(&mut self, entry: &ReportEntry) -> Result<()> {
        self.close()?;
        self.current_set = Some(entry.source.clone());
        Ok(())
    }

    fn test_set_completed(&mut self, _entry: &ReportEntry) -> Result<()> {
        self.close()
    }

    fn write_test_output(&mut self, bytes: &[u8], _stream: Stream) -> Result<()> {
        if self.file.is_none() {
            let path = self.output_path();
            fs::create_dir_all(&self.reports_dir).with_context(|| {
                format!(
                    "Failed to create reports directory: {}",
                    self.reports_dir.display()
                )
            })?;
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open test output file: {}", path.display()))?;
            self.file = Some(BufWriter::new(file));
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(bytes)
                .context("Failed to write test output file")?;
        }
        Ok(())
    }
}

impl Drop for ConsoleOutputFileReporter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_output_routes_by_stream() {
        let out = Arc::new(Mutex::new(Vec::<u8>::new()));
        let err = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut receiver = DirectConsoleOutput::new(ConsoleStreams::new(out.clone(), err.clone()));

        receiver.write_test_output(b"hello ", Stream::Stdout).unwrap();
        receiver.write_test_output(b"oops", Stream::Stderr).unwrap();
        receiver.write_test_output(b"world", Stream::Stdout).unwrap();

        assert_eq!(out.lock().unwrap().as_slice(), b"hello world");
        assert_eq!(err.lock().unwrap().as_slice(), b"oops");
    }

    #[test]
    fn test_file_output_is_lazy_and_per_set() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("reports");
        let mut receiver = ConsoleOutputFileReporter::new(dir.clone(), Some("f1".into()));

        receiver
            .test_set_starting(&ReportEntry::for_set("Quiet"))
            .unwrap();
        receiver
            .test_set_completed(&ReportEntry::for_set("Quiet"))
            .unwrap();
        assert!(!dir.join("Quiet-f1-output.txt").exists());

        receiver
            .test_set_starting(&ReportEntry::for_set("Noisy"))
            .unwrap();
        receiver.write_test_output(b"line 1\n", Stream::Stdout).unwrap();
        receiver.write_test_output(b"line 2\n", Stream::Stderr).unwrap();
        receiver
            .test_set_completed(&ReportEntry::for_set("Noisy"))
            .unwrap();

        let content = fs::read_to_string(dir.join("Noisy-f1-output.txt")).unwrap();
        assert_eq!(content, "line 1\nline 2\n");
    }

    #[test]
    fn test_late_output_stays_with_finished_set() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("reports");
        let mut receiver = ConsoleOutputFileReporter::new(dir.clone(), None);

        receiver.write_test_output(b"boot\n", Stream::Stdout).unwrap();
        receiver
            .test_set_starting(&ReportEntry::for_set("SuiteA"))
            .unwrap();
        receiver.write_test_output(b"during\n", Stream::Stdout).unwrap();
        receiver
            .test_set_completed(&ReportEntry::for_set("SuiteA"))
            .unwrap();
        receiver.write_test_output(b"late\n", Stream::Stdout).unwrap();
        drop(receiver);

        assert_eq!(fs::read_to_string(dir.join("startup-output.txt")).unwrap(), "boot\n");
        assert_eq!(
            fs::read_to_string(dir.join("SuiteA-output.txt")).unwrap(),
            "during\nlate\n"
        );
    }
}
