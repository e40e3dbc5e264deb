//! Request and response payloads exchanged with the GenAI platform API.
//!
//! Response types ignore unknown fields and default the optional ones, since
//! the service returns its full database rows and leaves columns null until a
//! task finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AnalysisId, CoreError, DocumentId, QueryId, SessionId, StatusReport, TaskId, TaskStatus, UserId,
};

/// Trim `text` and reject it if nothing is left.
fn non_blank(field: &str, text: impl Into<String>) -> Result<String, CoreError> {
    let text = text.into();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Body of the login and register calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Build a login request. The email is trimmed; the password is sent as given.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, CoreError> {
        let password = password.into();
        if password.is_empty() {
            return Err(CoreError::InvalidInput("password must not be empty".into()));
        }
        Ok(Self {
            email: non_blank("email", email)?,
            password,
        })
    }
}

/// Response of a successful login or register call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub user_id: UserId,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Research assistant
// ---------------------------------------------------------------------------

/// Body of a research submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Result<Self, CoreError> {
        Ok(Self {
            query: non_blank("research query", query)?,
        })
    }
}

/// Response of a research submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSubmitted {
    pub task_id: TaskId,
    #[serde(default)]
    pub status: TaskStatus,
}

/// Current state of a research task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchStatus {
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub query: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusReport for ResearchStatus {
    fn status(&self) -> &TaskStatus {
        &self.status
    }

    fn result_text(&self) -> Option<&str> {
        self.result.as_deref().filter(|r| !r.is_empty())
    }

    fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

// ---------------------------------------------------------------------------
// Resume feedback
// ---------------------------------------------------------------------------

/// Response of a resume upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSubmitted {
    pub analysis_id: AnalysisId,
    #[serde(default)]
    pub status: TaskStatus,
}

/// Current state of a resume analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeFeedback {
    #[serde(default)]
    pub id: Option<AnalysisId>,
    #[serde(default)]
    pub job_description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub feedback: Option<String>,
    /// Match score as sent; only 0-100 is reported by [`StatusReport::score`].
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusReport for ResumeFeedback {
    fn status(&self) -> &TaskStatus {
        &self.status
    }

    fn result_text(&self) -> Option<&str> {
        self.feedback.as_deref().filter(|f| !f.is_empty())
    }

    fn score(&self) -> Option<u8> {
        self.score
            .and_then(|s| u8::try_from(s).ok())
            .filter(|s| *s <= 100)
    }

    fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

// ---------------------------------------------------------------------------
// PDF chat
// ---------------------------------------------------------------------------

/// Response of a PDF upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUploaded {
    pub document_id: DocumentId,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: String,
}

/// Body of a chat query against uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQueryRequest {
    pub query: String,
    pub document_ids: Vec<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ChatQueryRequest {
    /// Build a chat query; at least one document is required.
    pub fn new(
        query: impl Into<String>,
        document_ids: Vec<DocumentId>,
        session_id: Option<SessionId>,
    ) -> Result<Self, CoreError> {
        if document_ids.is_empty() {
            return Err(CoreError::InvalidInput(
                "chat query needs at least one document".into(),
            ));
        }
        Ok(Self {
            query: non_blank("chat query", query)?,
            document_ids,
            session_id,
        })
    }
}

/// Assistant reply to a chat query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub response: String,
    /// Retrieved context the answer was grounded on, as returned.
    #[serde(default)]
    pub context: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Graph QA
// ---------------------------------------------------------------------------

/// Body of a graph query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQueryRequest {
    pub query: String,
}

impl GraphQueryRequest {
    pub fn new(query: impl Into<String>) -> Result<Self, CoreError> {
        Ok(Self {
            query: non_blank("graph query", query)?,
        })
    }
}

/// Acknowledgement returned by the graph endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphAck {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Text-to-SQL
// ---------------------------------------------------------------------------

/// Body of a natural-language SQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlQueryRequest {
    pub query: String,
}

impl SqlQueryRequest {
    pub fn new(query: impl Into<String>) -> Result<Self, CoreError> {
        Ok(Self {
            query: non_blank("SQL query", query)?,
        })
    }
}

/// Generated SQL and the data it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQueryReply {
    pub query_id: QueryId,
    pub sql: String,
    #[serde(default)]
    pub result_data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_status_from_service_row() {
        let json = r#"{
            "id": 12,
            "user_id": 3,
            "query": "rust async runtimes",
            "status": "completed",
            "result": "tokio dominates",
            "metadata": null,
            "created_at": "2024-05-01T10:00:00.123456+02:00",
            "completed_at": "2024-05-01T10:00:42Z"
        }"#;

        let status: ResearchStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.id, Some(TaskId::new("12")));
        assert!(status.status().is_terminal());
        assert_eq!(status.result_text(), Some("tokio dominates"));
        assert!(status.completed_at().is_some());
    }

    #[test]
    fn test_pending_research_has_no_result() {
        let json = r#"{"id": 1, "status": "pending", "result": "", "completed_at": null}"#;
        let status: ResearchStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, TaskStatus::Pending);
        assert_eq!(status.result_text(), None);
        assert_eq!(status.completed_at(), None);
    }

    #[test]
    fn test_resume_feedback_score() {
        let json = r#"{"id": 5, "status": "completed", "feedback": "solid", "score": 87}"#;
        let feedback: ResumeFeedback = serde_json::from_str(json).unwrap();
        assert_eq!(feedback.score(), Some(87));
        assert_eq!(feedback.result_text(), Some("solid"));
    }

    #[test]
    fn test_chat_request_omits_missing_session() {
        let request = ChatQueryRequest::new(
            " summarize ",
            vec![DocumentId::new("1"), DocumentId::new("2")],
            None,
        )
        .unwrap();
        assert_eq!(request.query, "summarize");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["document_ids"], serde_json::json!([1, 2]));
        assert!(json.get("session_id").is_none());
    }

    #[test]
    fn test_submission_ids_accept_integers() {
        let research: ResearchSubmitted =
            serde_json::from_str(r#"{"task_id": 9, "status": "started"}"#).unwrap();
        assert_eq!(research.task_id.as_str(), "9");
        assert_eq!(research.status, TaskStatus::Started);

        let resume: ResumeSubmitted = serde_json::from_str(r#"{"analysis_id": "a-1"}"#).unwrap();
        assert_eq!(resume.analysis_id.as_str(), "a-1");
        assert_eq!(resume.status, TaskStatus::Pending);
    }

    #[test]
    fn test_blank_queries_are_rejected() {
        assert!(matches!(
            ResearchRequest::new("   "),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(SqlQueryRequest::new("").is_err());
        assert!(GraphQueryRequest::new("\n").is_err());
        assert!(ChatQueryRequest::new("hi", vec![], None).is_err());
        assert!(LoginRequest::new("a@b.c", "").is_err());
        assert!(LoginRequest::new(" ", "pw").is_err());
    }

    #[test]
    fn test_out_of_range_score_is_ignored() {
        for score in ["140", "256", "1000", "-5"] {
            let json = format!(r#"{{"status": "completed", "score": {score}}}"#);
            let feedback: ResumeFeedback = serde_json::from_str(&json).unwrap();
            assert_eq!(feedback.status, TaskStatus::Completed);
            assert_eq!(feedback.score(), None);
        }
    }
}
