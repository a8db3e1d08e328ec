//! Core error taxonomy

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the aggregation and session core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Ride, review collection owner or user absent from the store
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    /// Session token which cannot be decoded into a session key
    #[error("Malformed session token: {0}")]
    MalformedToken(String),
    /// Password or session key not matching the current user secret
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Store call failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// Batch deadline fired before every child fetch reported
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            err @ StoreError::Unavailable(_) => Self::UpstreamUnavailable(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::UpstreamUnavailable(format!("Background task failed: {err}"))
    }
}
