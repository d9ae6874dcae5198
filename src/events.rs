// Lifecycle events as they appear in a newline-delimited JSON event log

use serde::{Deserialize, Serialize};

use crate::capture::Stream;
use crate::error::Result;
use crate::listener::TestSetListener;
use crate::state::ReportEntry;

/// One recorded call against a [`TestSetListener`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    SetStarting(ReportEntry),
    TestStarting(ReportEntry),
    TestSucceeded(ReportEntry),
    TestFailed(ReportEntry),
    TestError(ReportEntry),
    TestSkipped(ReportEntry),
    TestAssumptionFailure(ReportEntry),
    SetCompleted(ReportEntry),
    Output {
        text: String,
        #[serde(default)]
        stream: Stream,
    },
    Info {
        message: String,
    },
}

impl LifecycleEvent {
    /// Replay this event against `listener`.
    pub fn apply(&self, listener: &TestSetListener) -> Result<()> {
        match self {
            LifecycleEvent::SetStarting(entry) => listener.test_set_starting(entry),
            LifecycleEvent::TestStarting(entry) => listener.test_starting(entry),
            LifecycleEvent::TestSucceeded(entry) => listener.test_succeeded(entry),
            LifecycleEvent::TestFailed(entry) => listener.test_failed(entry),
            LifecycleEvent::TestError(entry) => listener.test_error(entry),
            LifecycleEvent::TestSkipped(entry) => listener.test_skipped(entry),
            LifecycleEvent::TestAssumptionFailure(entry) => listener.test_assumption_failure(entry),
            LifecycleEvent::SetCompleted(entry) => listener.test_set_completed(entry),
            LifecycleEvent::Output { text, stream } => {
                listener.write_text(text, stream.is_stdout())
            }
            LifecycleEvent::Info { message } => {
                listener.info(message);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_events() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"event":"test_failed","source":"SuiteA","name":"T2","message":"boom"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            LifecycleEvent::TestFailed(ReportEntry::new("SuiteA", "T2").with_message("boom"))
        );

        let event: LifecycleEvent =
            serde_json::from_str(r#"{"event":"output","text":"hi"}"#).unwrap();
        assert_eq!(
            event,
            LifecycleEvent::Output {
                text: "hi".into(),
                stream: Stream::Stdout
            }
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<LifecycleEvent>(r#"{"event":"explode"}"#).is_err());
    }
}
