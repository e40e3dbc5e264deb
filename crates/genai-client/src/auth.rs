//! Session management: the signed-in user's token and where it is persisted.
//!
//! [`AuthState`] is an explicit value handed to every API client instead of a
//! process-wide store. Cloning it is cheap and all clones share one session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use genai_core::{AuthResponse, LoginRequest, UserId};

use crate::error::ClientError;
use crate::http::HttpClient;

/// Environment variable overriding the credentials file location.
pub const CREDENTIALS_ENV: &str = "GENAI_CREDENTIALS";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub email: String,
}

/// What gets persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: UserInfo,
}

impl From<AuthResponse> for StoredSession {
    fn from(resp: AuthResponse) -> Self {
        Self {
            token: resp.token,
            user: UserInfo {
                id: resp.user_id,
                email: resp.email,
            },
        }
    }
}

/// Persistent key-value storage for the session.
pub trait CredentialStore: Send + Sync {
    /// Read the persisted session, if any.
    fn load(&self) -> Result<Option<StoredSession>, ClientError>;

    /// Persist the session, replacing any previous one.
    fn save(&self, session: &StoredSession) -> Result<(), ClientError>;

    /// Forget the persisted session.
    fn clear(&self) -> Result<(), ClientError>;
}

/// Stores the session as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$GENAI_CREDENTIALS`, else `$HOME/.genai/credentials.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CREDENTIALS_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        std::env::var("HOME")
            .ok()
            .map(|home| Path::new(&home).join(".genai").join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map(Some).map_err(|e| {
            ClientError::Credentials(format!("{}: {}", self.path.display(), e))
        })
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Credentials(e.to_string()))?;
        std::fs::write(&self.path, raw)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the session in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<StoredSession>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredSession>, ClientError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// The current session, backed by a [`CredentialStore`].
#[derive(Clone)]
pub struct AuthState {
    session: Arc<RwLock<Option<StoredSession>>>,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Signed-out state backed by `store`.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// Restore whatever session `store` holds.
    pub fn load(store: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        let session = store.load()?;
        if let Some(s) = &session {
            debug!(email = %s.user.email, "Restored session");
        }
        Ok(Self {
            session: Arc::new(RwLock::new(session)),
            store,
        })
    }

    /// Signed-out state that is never persisted.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::default()))
    }

    /// Persist and adopt the session returned by login/register.
    pub fn sign_in(&self, response: AuthResponse) -> Result<UserInfo, ClientError> {
        let session = StoredSession::from(response);
        self.store.save(&session)?;
        let user = session.user.clone();
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        Ok(user)
    }

    /// Drop the session and its persisted copy.
    pub fn sign_out(&self) -> Result<(), ClientError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.store.clear()
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Headers to attach to authenticated requests; empty when signed out.
    pub fn get_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(session) = self.read().as_ref() {
            headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", session.token),
            );
        }
        headers
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<StoredSession>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Client for the public auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: HttpClient,
}

impl AuthClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Create an account and sign in as it.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserInfo, ClientError> {
        let request = LoginRequest::new(email, password)?;
        let response: AuthResponse = self
            .http
            .post_json_public("/api/v1/auth/register", &request)
            .await?;
        let user = self.http.auth().sign_in(response)?;
        info!(email = %user.email, "Registered");
        Ok(user)
    }

    /// Sign in with existing credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo, ClientError> {
        let request = LoginRequest::new(email, password)?;
        let response: AuthResponse = self
            .http
            .post_json_public("/api/v1/auth/login", &request)
            .await?;
        let user = self.http.auth().sign_in(response)?;
        info!(email = %user.email, "Logged in");
        Ok(user)
    }

    /// Forget the session locally. The service keeps no server-side session.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.http.auth().sign_out()?;
        info!("Logged out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        self.http.auth().user()
    }
}
