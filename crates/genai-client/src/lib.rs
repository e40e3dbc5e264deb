//! Client library for the GenAI platform API.
//!
//! Provides the HTTP clients behind each dashboard panel, explicit session
//! management, and the poll-until-terminal engine used to follow research
//! tasks and resume analyses.

pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod pdf;
pub mod poll;
pub mod research;
pub mod resume;
pub mod sql;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use auth::{
    AuthClient, AuthState, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    StoredSession, UserInfo,
};
pub use config::ClientConfig;
pub use error::ClientError;
pub use graph::GraphClient;
pub use http::HttpClient;
pub use pdf::{ChatMessage, ChatSession, PdfChatClient, Role};
pub use poll::{
    poll_until_terminal, Cancellation, PollConfig, PollHandle, PollOutcome, PollSession,
    PollState, Poller, StatusFetcher, StopReason, UpdateSink,
};
pub use research::ResearchClient;
pub use resume::ResumeClient;
pub use sql::SqlClient;
pub use tracker::TaskTracker;

/// Combined client with access to every panel's endpoints.
///
/// All sub-clients share one connection pool and one [`AuthState`].
#[derive(Debug, Clone)]
pub struct GenAiClient {
    /// Login, register and logout.
    pub auth: AuthClient,
    /// Research assistant.
    pub research: ResearchClient,
    /// Resume feedback.
    pub resume: ResumeClient,
    /// PDF chat.
    pub pdf: PdfChatClient,
    /// Graph QA.
    pub graph: GraphClient,
    /// Text-to-SQL.
    pub sql: SqlClient,
}

impl GenAiClient {
    pub fn new(config: &ClientConfig, auth: AuthState) -> Result<Self, ClientError> {
        let http = HttpClient::new(config, auth)?;
        Ok(Self {
            auth: AuthClient::new(http.clone()),
            research: ResearchClient::new(http.clone()),
            resume: ResumeClient::new(http.clone()),
            pdf: PdfChatClient::new(http.clone()),
            graph: GraphClient::new(http.clone()),
            sql: SqlClient::new(http),
        })
    }
}
