//! PDF chat: upload documents, then ask questions about them.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use tracing::info;

use genai_core::{ChatQueryRequest, ChatReply, DocumentId, DocumentUploaded, SessionId};

use crate::error::ClientError;
use crate::http::HttpClient;
use crate::resume::file_name;

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Retrieved context, assistant messages only.
    pub context: Option<serde_json::Value>,
}

/// A conversation over a fixed set of uploaded documents.
///
/// The service assigns the session id on the first answer; later questions
/// send it back so they land in the same conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    document_ids: Vec<DocumentId>,
    session_id: Option<SessionId>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(document_ids: Vec<DocumentId>) -> Self {
        Self {
            document_ids,
            ..Self::default()
        }
    }

    /// Resume a conversation the service already knows about.
    pub fn resume(document_ids: Vec<DocumentId>, session_id: SessionId) -> Self {
        Self {
            document_ids,
            session_id: Some(session_id),
            messages: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// Client for the PDF upload and chat endpoints.
#[derive(Debug, Clone)]
pub struct PdfChatClient {
    http: HttpClient,
}

impl PdfChatClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Upload one PDF.
    pub async fn upload(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<DocumentUploaded, ClientError> {
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let uploaded: DocumentUploaded = self.http.post_multipart("/api/v1/pdf/upload", form).await?;
        info!(
            document_id = %uploaded.document_id,
            file = %file_name,
            status = %uploaded.status,
            "Document uploaded"
        );
        Ok(uploaded)
    }

    /// Upload several files; stops at the first failure.
    pub async fn upload_paths(&self, paths: &[PathBuf]) -> Result<Vec<DocumentUploaded>, ClientError> {
        let mut uploaded = Vec::with_capacity(paths.len());
        for path in paths {
            uploaded.push(self.upload_path(path).await?);
        }
        Ok(uploaded)
    }

    pub async fn upload_path(&self, path: &Path) -> Result<DocumentUploaded, ClientError> {
        let contents = tokio::fs::read(path).await?;
        self.upload(&file_name(path), contents).await
    }

    /// Ask a question in `session` and record both turns in it.
    pub async fn ask(&self, session: &mut ChatSession, query: &str) -> Result<ChatReply, ClientError> {
        let request = ChatQueryRequest::new(
            query,
            session.document_ids.clone(),
            session.session_id.clone(),
        )?;

        let reply: ChatReply = self.http.post_json("/api/v1/chat/query", &request).await?;

        if session.session_id.is_none() {
            session.session_id = Some(reply.session_id.clone());
        }
        session.messages.push(ChatMessage {
            role: Role::User,
            content: request.query,
            context: None,
        });
        session.messages.push(ChatMessage {
            role: Role::Assistant,
            content: reply.response.clone(),
            context: Some(reply.context.clone()),
        });

        Ok(reply)
    }
}
