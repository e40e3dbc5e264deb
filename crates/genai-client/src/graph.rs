//! Graph-based QA endpoints.
//!
//! The service currently acknowledges these calls without doing any graph
//! work; the acknowledgement is returned unchanged.

use serde_json::json;

use genai_core::{GraphAck, GraphQueryRequest};

use crate::error::ClientError;
use crate::http::HttpClient;

/// Client for the graph upload and query endpoints.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: HttpClient,
}

impl GraphClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Ask the service to build the knowledge graph.
    pub async fn upload(&self) -> Result<GraphAck, ClientError> {
        self.http.post_json("/api/v1/graph/upload", &json!({})).await
    }

    pub async fn query(&self, query: &str) -> Result<GraphAck, ClientError> {
        let request = GraphQueryRequest::new(query)?;
        self.http.post_json("/api/v1/graph/query", &request).await
    }
}
