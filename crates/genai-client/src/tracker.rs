//! In-memory record of submitted tasks, fed by poll sessions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use genai_core::{StatusReport, Task};

/// Latest known state of every submitted task.
///
/// This is the standard result sink: [`TaskTracker::sink`] returns an
/// [`UpdateSink`](crate::poll::UpdateSink) that applies each fetched report
/// to the tracked task. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly submitted task.
    pub fn insert(&self, task: Task) {
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.task_id.clone(), task);
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    /// All tracked tasks, most recently submitted first.
    pub fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Apply a report to the task it belongs to. Unknown ids are ignored.
    pub fn apply<R: StatusReport + ?Sized>(&self, task_id: &str, report: &R) -> Option<Task> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        match tasks.get_mut(task_id) {
            Some(task) => {
                task.apply(report);
                Some(task.clone())
            }
            None => {
                debug!(task_id = %task_id, "Ignoring update for untracked task");
                None
            }
        }
    }

    /// Sink that applies every update to `task_id`.
    pub fn sink<R>(&self, task_id: impl Into<String>) -> impl Fn(R) + Send + Sync + 'static
    where
        R: StatusReport + 'static,
    {
        let tracker = self.clone();
        let task_id = task_id.into();
        move |report: R| {
            tracker.apply(&task_id, &report);
        }
    }
}
