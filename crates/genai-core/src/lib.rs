//! GenAI Platform Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Credential storage
//! - Runtime specifics
//!
//! All types here describe what the GenAI platform API exchanges with its
//! clients and how a client tracks a long-running task.

pub mod api;
pub mod error;
pub mod ids;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use api::{
    AuthResponse, ChatQueryRequest, ChatReply, DocumentUploaded, GraphAck, GraphQueryRequest,
    LoginRequest, ResearchRequest, ResearchStatus, ResearchSubmitted, ResumeFeedback,
    ResumeSubmitted, SqlQueryReply, SqlQueryRequest,
};
pub use error::CoreError;
pub use ids::{AnalysisId, DocumentId, QueryId, SessionId, TaskId, UserId};
pub use status::TaskStatus;
pub use task::{StatusReport, Task, TaskKind};
