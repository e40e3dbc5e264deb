//! HTTP transport for the platform's REST endpoints.

use reqwest::multipart::Form;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::auth::AuthState;
use crate::config::ClientConfig;
use crate::error::ClientError;

/// HTTP client for REST API endpoints.
///
/// Cloning shares the connection pool and the session.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    auth: AuthState,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(config: &ClientConfig, auth: AuthState) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// The session attached to outgoing requests.
    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated GET, decoding a JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");

        let request = self.authorize(self.inner.get(&url))?;
        decode(request.send().await?, path).await
    }

    /// Authenticated POST with a JSON body.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST request");

        let request = self.authorize(self.inner.post(&url).json(body))?;
        decode(request.send().await?, path).await
    }

    /// POST with a JSON body and no credentials (login/register).
    pub async fn post_json_public<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST request (public)");

        decode(self.inner.post(&url).json(body).send().await?, path).await
    }

    /// Authenticated multipart POST.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "POST multipart request");

        let request = self.authorize(self.inner.post(&url).multipart(form))?;
        decode(request.send().await?, path).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, mut request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let headers = self.auth.get_headers();
        if headers.is_empty() {
            return Err(ClientError::NotAuthenticated);
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }
        Ok(request)
    }
}

/// `collection` followed by `id` as one percent-encoded path segment.
///
/// Ids are opaque text, so `/`, `?` and `#` must not leak into the URL
/// structure.
pub(crate) fn resource_path(collection: &str, id: &str) -> Result<String, ClientError> {
    let mut url = Url::parse("http://localhost/")
        .map_err(|e| ClientError::InvalidInput(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidInput(format!("cannot build path for {id:?}")))?
        .pop_if_empty()
        .extend(collection.split('/').filter(|segment| !segment.is_empty()))
        .push(id);
    Ok(url.path().to_string())
}

/// Map non-2xx to [`ClientError::Status`], otherwise decode the JSON body.
async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            path: path.to_string(),
            message: message.trim().to_string(),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Serialization(format!("{path}: {e}")))
}
