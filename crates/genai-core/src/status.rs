//! Status values reported for long-running tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a research task or resume analysis as reported by the service.
///
/// The service emits lower-case strings. Only `completed` is terminal; it
/// never reports a distinct failure status, so any unrecognized value is kept
/// verbatim in [`TaskStatus::Other`] and treated like a task still running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// Task accepted but not yet picked up.
    #[default]
    Pending,
    /// Research task submitted and started.
    Started,
    /// Resume analysis in progress.
    Processing,
    /// Task finished and its result is available.
    Completed,
    /// Any other value returned by the service.
    Other(String),
}

impl TaskStatus {
    /// Returns true if no further state change is expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the task is still in flight.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "started" => Self::Started,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
