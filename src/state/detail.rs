// Per-set detail counters handed to reporters

use std::time::{Duration, Instant};

/// Running counters and timings for the test set currently being reported.
///
/// Owned by exactly one listener and reused across sets: it is reset at every
/// set boundary rather than rebuilt.
#[derive(Debug, Clone)]
pub struct SetDetail {
    trim_stack_trace: bool,
    started: usize,
    completed: usize,
    errors: usize,
    failures: usize,
    skipped: usize,
    set_started_at: Option<Instant>,
    test_started_at: Option<Instant>,
    last_test_elapsed: Duration,
}

impl SetDetail {
    pub fn new(trim_stack_trace: bool) -> Self {
        Self {
            trim_stack_trace,
            started: 0,
            completed: 0,
            errors: 0,
            failures: 0,
            skipped: 0,
            set_started_at: None,
            test_started_at: None,
            last_test_elapsed: Duration::ZERO,
        }
    }

    /// Begin a new set: zero the counters and stamp the start time.
    pub fn test_set_start(&mut self) {
        self.reset();
        self.set_started_at = Some(Instant::now());
    }

    /// Begin a test: count it and stamp its start time.
    pub fn test_start(&mut self) {
        self.increment_started();
        self.test_started_at = Some(Instant::now());
    }

    /// Conclude the in-flight test and return its elapsed time.
    pub fn test_end(&mut self) -> Duration {
        self.increment_completed();
        self.last_test_elapsed = self
            .test_started_at
            .take()
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.last_test_elapsed
    }

    pub fn increment_started(&mut self) {
        self.started += 1;
    }

    pub fn increment_completed(&mut self) {
        self.completed += 1;
    }

    pub fn increment_error(&mut self) {
        self.errors += 1;
    }

    pub fn increment_failure(&mut self) {
        self.failures += 1;
    }

    pub fn increment_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Zero every counter and timing; the trim policy is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.trim_stack_trace);
    }

    pub fn trim_stack_trace(&self) -> bool {
        self.trim_stack_trace
    }

    pub fn started(&self) -> usize {
        self.started
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn succeeded(&self) -> usize {
        self.completed
            .saturating_sub(self.errors + self.failures + self.skipped)
    }

    pub fn had_failures(&self) -> bool {
        self.errors + self.failures > 0
    }

    /// Elapsed time of the last concluded test
    pub fn last_test_elapsed(&self) -> Duration {
        self.last_test_elapsed
    }

    /// Time since the current set started, zero outside a set
    pub fn elapsed_for_test_set(&self) -> Duration {
        self.set_started_at
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "Tests run: {}, Failures: {}, Errors: {}, Skipped: {}, Time elapsed: {}",
            self.completed,
            self.failures,
            self.errors,
            self.skipped,
            format_elapsed(self.elapsed_for_test_set())
        );
        if self.had_failures() {
            line.push_str(" <<< FAILURE!");
        }
        line
    }
}

impl Default for SetDetail {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Seconds with millisecond precision, e.g. `0.125 sec`
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3} sec", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_matches_outcomes() {
        let mut detail = SetDetail::new(false);
        detail.test_set_start();

        detail.test_start();
        detail.test_end();

        detail.test_start();
        detail.increment_failure();
        detail.test_end();

        detail.test_start();
        detail.increment_skipped();
        detail.test_end();

        assert_eq!(detail.started(), 3);
        assert_eq!(detail.completed(), 3);
        assert_eq!(detail.succeeded(), 1);
        assert_eq!(
            detail.completed(),
            detail.succeeded() + detail.failures() + detail.errors() + detail.skipped()
        );
    }

    #[test]
    fn test_reset_keeps_trim_policy() {
        let mut detail = SetDetail::new(true);
        detail.test_set_start();
        detail.test_start();
        detail.increment_error();
        detail.test_end();

        detail.reset();

        assert!(detail.trim_stack_trace());
        assert_eq!(detail.completed(), 0);
        assert_eq!(detail.errors(), 0);
        assert_eq!(detail.elapsed_for_test_set(), Duration::ZERO);
    }

    #[test]
    fn test_summary_line_flags_failures() {
        let mut detail = SetDetail::default();
        detail.test_set_start();
        assert!(detail.summary_line().starts_with(
            "Tests run: 0, Failures: 0, Errors: 0, Skipped: 0, Time elapsed: "
        ));
        assert!(!detail.summary_line().ends_with("<<< FAILURE!"));

        detail.test_start();
        detail.increment_error();
        detail.test_end();
        assert!(detail.summary_line().ends_with("<<< FAILURE!"));
    }

    #[test]
    fn test_test_end_without_start_has_zero_elapsed() {
        let mut detail = SetDetail::default();
        assert_eq!(detail.test_end(), Duration::ZERO);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(1250)), "1.250 sec");
    }
}
