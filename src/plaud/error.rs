// Plaud client errors

use std::time::Duration;

/// Failures talking to the Plaud API
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaudError {
    /// Credential rejected (HTTP 401/403). Never retried.
    #[error("Plaud rejected the credential (HTTP {0})")]
    Auth(u16),

    /// Timeout, connection failure or 5xx; retried before surfacing
    #[error("Plaud request failed: {0}")]
    Transient(String),

    /// HTTP 429 that outlasted the retry budget
    #[error("Plaud rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    /// Well-formed response that reports a failure
    #[error("Plaud API error {status}: {msg}")]
    Api { status: i64, msg: String },

    #[error("Invalid Plaud response: {0}")]
    Decode(String),
}

impl PlaudError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaudError::Transient(_) | PlaudError::RateLimited { .. })
    }

    /// Server-requested wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PlaudError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlaudError::Transient(format!("timed out: {}", err))
        } else if err.is_connect() {
            PlaudError::Transient(format!("connection failed: {}", err))
        } else if err.is_decode() {
            PlaudError::Decode(err.to_string())
        } else {
            PlaudError::Transient(err.to_string())
        }
    }
}
