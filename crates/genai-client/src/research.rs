//! Research assistant: submit a query, then poll its task.

use async_trait::async_trait;
use tracing::info;

use genai_core::{ResearchRequest, ResearchStatus, ResearchSubmitted, TaskId};

use crate::error::ClientError;
use crate::http::{resource_path, HttpClient};
use crate::poll::StatusFetcher;

/// Client for the research agent endpoints.
#[derive(Debug, Clone)]
pub struct ResearchClient {
    http: HttpClient,
}

impl ResearchClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Submit a research query and return the task id assigned to it.
    ///
    /// No retry: any failure is returned as is and nothing gets polled.
    pub async fn submit(&self, query: &str) -> Result<TaskId, ClientError> {
        let request = ResearchRequest::new(query)?;
        let submitted: ResearchSubmitted =
            self.http.post_json("/api/v1/agent/research", &request).await?;

        info!(task_id = %submitted.task_id, "Research task submitted");
        Ok(submitted.task_id)
    }

    /// Fetch the current state of a research task.
    pub async fn status(&self, task_id: &TaskId) -> Result<ResearchStatus, ClientError> {
        let path = resource_path("/api/v1/agent/research", task_id.as_str())?;
        self.http.get_json(&path).await
    }
}

#[async_trait]
impl StatusFetcher for ResearchClient {
    type Report = ResearchStatus;

    async fn fetch_status(&self, task_id: &str) -> Result<ResearchStatus, ClientError> {
        self.status(&TaskId::new(task_id)).await
    }
}
