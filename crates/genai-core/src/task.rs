//! Client-side tracking of long-running tasks.

use crate::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Common view over the status responses of the polled endpoints.
pub trait StatusReport {
    /// Status reported by the service.
    fn status(&self) -> &TaskStatus;

    /// Result payload, present once the task has produced one.
    fn result_text(&self) -> Option<&str> {
        None
    }

    /// Score attached to the result, if the endpoint reports one.
    fn score(&self) -> Option<u8> {
        None
    }

    /// When the service finished the task.
    fn completed_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Kind of remote work a [`Task`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Research query handled by the research agent.
    Research,
    /// Resume scored against a job description.
    ResumeAnalysis,
}

impl TaskKind {
    /// Status a freshly submitted task of this kind starts in.
    pub fn initial_status(&self) -> TaskStatus {
        match self {
            Self::Research => TaskStatus::Started,
            Self::ResumeAnalysis => TaskStatus::Processing,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Research => f.pad("research"),
            Self::ResumeAnalysis => f.pad("resume analysis"),
        }
    }
}

/// A Task is one unit of remote work submitted by the user.
///
/// Created once after a successful submission; afterwards only status reports
/// fetched while polling change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned by the service.
    pub task_id: String,

    /// What kind of work this is.
    pub kind: TaskKind,

    /// The research query or the uploaded resume's file name.
    pub description: String,

    /// Latest known status.
    pub status: TaskStatus,

    /// Result payload (research summary or resume feedback).
    pub result: Option<String>,

    /// Resume score, 0-100.
    pub score: Option<u8>,

    /// When the task was submitted.
    pub created_at: DateTime<Utc>,

    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new Task right after submission.
    pub fn new(task_id: impl Into<String>, kind: TaskKind, description: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            description: description.into(),
            status: kind.initial_status(),
            result: None,
            score: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a fetched status report.
    ///
    /// The status is always replaced. Result, score and completion time are
    /// only overwritten when the report carries them.
    pub fn apply<R: StatusReport + ?Sized>(&mut self, report: &R) {
        self.status = report.status().clone();

        if let Some(result) = report.result_text() {
            self.result = Some(result.to_string());
        }
        if let Some(score) = report.score() {
            self.score = Some(score);
        }

        if self.status.is_terminal() {
            if self.completed_at.is_none() {
                self.completed_at = Some(report.completed_at().unwrap_or_else(Utc::now));
            }
        } else {
            self.completed_at = None;
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
