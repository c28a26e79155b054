use std::fmt;

/// Result of a step that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step changed something.
    Done(String),
    /// Nothing to do, or a recoverable failure that was logged.
    Ignored(String),
}

impl StepOutcome {
    pub fn done(detail: impl Into<String>) -> Self {
        Self::Done(detail.into())
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored(reason.into())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Done(s) | Self::Ignored(s) => s,
        }
    }

    /// Fold several sub-results: done if any sub-step did something.
    pub fn merge(outcomes: impl IntoIterator<Item = StepOutcome>) -> Self {
        let mut done = Vec::new();
        let mut ignored = Vec::new();
        for outcome in outcomes {
            match outcome {
                Self::Done(s) => done.push(s),
                Self::Ignored(s) => ignored.push(s),
            }
        }
        if done.is_empty() {
            Self::Ignored(ignored.join("; "))
        } else {
            Self::Done(done.join("; "))
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(s) => write!(f, "done: {s}"),
            Self::Ignored(s) => write!(f, "skipped: {s}"),
        }
    }
}
