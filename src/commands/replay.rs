// Replay command - drive a listener from a recorded event log

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReplayArgs;
use crate::config::{Config, ReportConfiguration};
use crate::events::LifecycleEvent;
use crate::listener::TestSetListener;
use crate::report::console::print_run_summary;
use crate::state::{GlobalStatistics, RunResult};

/// Feed every event in `reader` to `listener`; returns the number of events applied.
///
/// Blank lines are ignored. The first malformed or out-of-order event stops the
/// replay with its line number attached.
pub fn replay_reader(reader: impl BufRead, listener: &TestSetListener) -> Result<usize> {
    let mut applied = 0;
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read event log line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let event: LifecycleEvent = serde_json::from_str(&line)
            .with_context(|| format!("Invalid event on line {line_no}"))?;
        event
            .apply(listener)
            .with_context(|| format!("Event on line {line_no} rejected"))?;
        applied += 1;
    }
    Ok(applied)
}

pub fn replay_file(path: &Path, listener: &TestSetListener) -> Result<usize> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open event log: {}", path.display()))?;
    replay_reader(BufReader::new(file), listener)
}

/// Replay `args.events` with the file configuration plus command-line overrides.
pub fn run_replay(args: &ReplayArgs, config: Option<Config>) -> Result<RunResult> {
    let mut options = config.unwrap_or_default().report;
    args.apply(&mut options)?;

    let configuration = ReportConfiguration::new(options);
    let global = Arc::new(GlobalStatistics::new());
    let listener = configuration.create_listener(Arc::clone(&global));
    info!(reporters = ?listener.reporter_names(), "Replaying {}", args.events.display());

    let applied = replay_file(&args.events, &listener)?;
    info!("Applied {} event(s)", applied);

    let result = global.summary();
    print_run_summary(&mut io::stdout().lock(), &result)
        .context("Failed to print run summary")?;
    Ok(result)
}
