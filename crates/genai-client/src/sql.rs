//! Natural-language to SQL console.

use tracing::info;

use genai_core::{SqlQueryReply, SqlQueryRequest};

use crate::error::ClientError;
use crate::http::HttpClient;

/// Client for the text-to-SQL endpoint.
#[derive(Debug, Clone)]
pub struct SqlClient {
    http: HttpClient,
}

impl SqlClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Translate `query` to SQL and run it on the service side.
    pub async fn query(&self, query: &str) -> Result<SqlQueryReply, ClientError> {
        let request = SqlQueryRequest::new(query)?;
        let reply: SqlQueryReply = self.http.post_json("/api/v1/sql/query", &request).await?;
        info!(query_id = %reply.query_id, "SQL query executed");
        Ok(reply)
    }
}
