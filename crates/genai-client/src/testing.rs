//! Shared fixtures for tests that talk to an in-process API server.

use axum::Router;
use tokio::net::TcpListener;

use genai_core::{AuthResponse, UserId};

use crate::auth::AuthState;
use crate::config::ClientConfig;
use crate::http::HttpClient;

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Client against `base_url`, signed in with `token` when given.
pub(crate) fn client(base_url: &str, token: Option<&str>) -> HttpClient {
    let auth = AuthState::in_memory();
    if let Some(token) = token {
        auth.sign_in(AuthResponse {
            token: token.to_string(),
            user_id: UserId::from(1),
            email: "tester@example.com".to_string(),
        })
        .unwrap();
    }
    HttpClient::new(&ClientConfig::default().with_base_url(base_url), auth).unwrap()
}
