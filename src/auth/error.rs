//! Error types for authentication configuration changes.
//!
//! Three kinds, surfaced verbatim to the caller:
//! - `Validation` — input fails static constraints; detected before any
//!   side effect.
//! - `Conflict` — wrong current mode for the operation, or an
//!   optimistic-concurrency race lost; safe to retry after re-reading.
//! - `Backend` — storage or hashing facility failure; possibly transient.
//!
//! No kind is fatal to the process, and every failure leaves the persisted
//! configuration unchanged. Retry policy belongs to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Whether re-reading current state and retrying can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Backend(_))
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
