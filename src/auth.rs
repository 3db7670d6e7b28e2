//! Request-to-user resolution
//!
//! Internal callers (the scheduler host, cron jobs) authenticate with a shared
//! secret and name the user by email. Everything else goes through the
//! session lookup supplied by the embedding service.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;

use crate::database::DatabaseManager;

pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("You must be logged in")]
    Unauthorized,
    #[error("User lookup failed: {0}")]
    Store(String),
}

#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Local user id for the caller behind these headers
    async fn resolve(&self, headers: &HeaderMap) -> Result<String, AuthError>;
}

/// Session-backed identity owned by whatever hosts the pipeline
#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn user_id(&self, headers: &HeaderMap) -> Option<String>;
}

pub struct InternalServiceResolver {
    db: Arc<DatabaseManager>,
    secret: Option<String>,
    sessions: Option<Arc<dyn SessionLookup>>,
}

impl InternalServiceResolver {
    /// An empty secret disables internal calls
    pub fn new(db: Arc<DatabaseManager>, secret: Option<String>) -> Self {
        Self {
            db,
            secret: secret.filter(|s| !s.is_empty()),
            sessions: None,
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionLookup>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    fn internal_user(&self, headers: &HeaderMap) -> Result<Option<String>, AuthError> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(None);
        };
        let presented = header(headers, INTERNAL_SECRET_HEADER);
        let email = header(headers, USER_EMAIL_HEADER);

        match (presented, email) {
            (Some(presented), Some(email)) if presented == secret => {
                let user = self
                    .db
                    .get_user_by_email(email)
                    .map_err(|e| AuthError::Store(format!("{:#}", e)))?;
                if user.is_none() {
                    log::warn!("Internal call for unknown user {}", email);
                }
                Ok(user.map(|u| u.id))
            }
            (Some(_), _) => {
                log::warn!("Rejected internal call with a bad secret or no user email");
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl UserResolver for InternalServiceResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        if let Some(user_id) = self.internal_user(headers)? {
            return Ok(user_id);
        }
        if let Some(sessions) = &self.sessions {
            if let Some(user_id) = sessions.user_id(headers).await {
                return Ok(user_id);
            }
        }
        Err(AuthError::Unauthorized)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
