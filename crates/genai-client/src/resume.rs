//! Resume feedback: upload a resume with a job description, then poll the analysis.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::info;

use genai_core::{AnalysisId, ResumeFeedback, ResumeSubmitted};

use crate::error::ClientError;
use crate::http::{resource_path, HttpClient};
use crate::poll::StatusFetcher;

/// Client for the resume analysis endpoints.
#[derive(Debug, Clone)]
pub struct ResumeClient {
    http: HttpClient,
}

impl ResumeClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Upload a resume and return the id of the analysis it starts.
    pub async fn upload(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        job_description: &str,
    ) -> Result<AnalysisId, ClientError> {
        if contents.is_empty() {
            return Err(ClientError::InvalidInput(format!("{file_name} is empty")));
        }

        let form = Form::new()
            .part("resume", Part::bytes(contents).file_name(file_name.to_string()))
            .text("job_description", job_description.to_string());

        let submitted: ResumeSubmitted = self
            .http
            .post_multipart("/api/v1/resume/upload", form)
            .await?;

        info!(
            analysis_id = %submitted.analysis_id,
            file = %file_name,
            "Resume uploaded"
        );
        Ok(submitted.analysis_id)
    }

    /// Read `path` and upload it.
    pub async fn upload_path(
        &self,
        path: &Path,
        job_description: &str,
    ) -> Result<AnalysisId, ClientError> {
        let contents = tokio::fs::read(path).await?;
        self.upload(&file_name(path), contents, job_description).await
    }

    /// Fetch the current state of an analysis.
    pub async fn feedback(&self, analysis_id: &AnalysisId) -> Result<ResumeFeedback, ClientError> {
        let path = resource_path("/api/v1/resume/feedback", analysis_id.as_str())?;
        self.http.get_json(&path).await
    }
}

#[async_trait]
impl StatusFetcher for ResumeClient {
    type Report = ResumeFeedback;

    async fn fetch_status(&self, analysis_id: &str) -> Result<ResumeFeedback, ClientError> {
        self.feedback(&AnalysisId::new(analysis_id)).await
    }
}

/// Final path component, used as the uploaded file name.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
