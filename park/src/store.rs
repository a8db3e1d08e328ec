//! Collaborator traits for the data the core reads
//!
//! The aggregator only needs [`EntityStore`], the session validator only needs
//! [`CredentialStore`]. Both are object safe and used behind `Arc<dyn _>`, so the service can plug
//! in its SQLite adapter and tests can plug in [`memory::MemoryStore`] or a wrapper around it.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Picture, Review, Ride, RideId, User, UserId};

pub mod memory;

/// Errors reported by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("Store unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn unavailable(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Unavailable(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to rides and their child collections
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    /// Fetches a single ride, without child collections
    async fn ride(&self, ride_id: &RideId) -> StoreResult<Ride>;

    /// Lists all rides, without child collections
    async fn rides(&self) -> StoreResult<Vec<Ride>>;

    /// Reviews of a ride, newest first
    async fn reviews_for_ride(&self, ride_id: &RideId) -> StoreResult<Vec<Review>>;

    /// Pictures of a ride, in collection order
    async fn pictures_for_ride(&self, ride_id: &RideId) -> StoreResult<Vec<Picture>>;
}

/// Read access to user credentials
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: &UserId) -> StoreResult<User>;

    async fn user_by_email(&self, email: &str) -> StoreResult<User>;
}
