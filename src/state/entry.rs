// Report entry structures

use serde::{Deserialize, Serialize};

/// Failure detail attached to a failed or errored test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Failure kind, e.g. the assertion or exception type
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stack-like trace, outermost frame first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl FailureDetail {
    pub fn new(kind: impl Into<String>, message: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            message,
            trace: Vec::new(),
        }
    }

    pub fn with_trace<I, S>(mut self, trace: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trace = trace.into_iter().map(Into::into).collect();
        self
    }

    /// `kind: message`, or just the kind when there is no message
    pub fn headline(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.kind, message),
            None => self.kind.clone(),
        }
    }

    /// Render the headline and trace.
    ///
    /// When `trim` is set only frames that mention `source` are kept.
    pub fn render(&self, source: &str, trim: bool) -> String {
        let mut out = self.headline();
        for frame in &self.trace {
            if trim && !frame.contains(source) {
                continue;
            }
            out.push_str("\n\tat ");
            out.push_str(frame);
        }
        out
    }
}

/// Immutable record of one test lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Owning test set, e.g. the class or suite name
    pub source: String,
    /// Test (method) name; equals the source for set-level events
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl ReportEntry {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            message: None,
            failure: None,
            elapsed_ms: None,
        }
    }

    /// Entry describing a whole test set
    pub fn for_set(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::new(source.clone(), source)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_failure(mut self, failure: FailureDetail) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    /// Short description recorded in the run's failure/error listings
    pub fn failure_summary(&self) -> String {
        self.failure
            .as_ref()
            .and_then(|f| f.message.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.failure.as_ref().map(|f| f.kind.clone()))
            .unwrap_or_default()
    }

    /// Failure text for reports, honoring the trim policy
    pub fn render_failure(&self, trim: bool) -> Option<String> {
        match (&self.failure, &self.message) {
            (Some(failure), _) => Some(failure.render(&self.source, trim)),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        }
    }
}
