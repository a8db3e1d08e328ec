//! Users known to the credential store

use chrono::{DateTime, Utc};
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// Newtype for user id
///
/// Opaque on purpose: session keys embed it verbatim, so any string (including an empty one)
/// has to survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// User account as seen by authentication
#[derive(Derivative, Clone, PartialEq)]
#[derivative(Debug)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Current password hash, rotated whenever the password changes
    #[derivative(Debug = "ignore")]
    pub password_hash: String,
    pub registered_on: DateTime<Utc>,
}

impl User {
    /// Helper to create an user registered now
    pub fn new(
        id: impl Into<UserId>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            registered_on: Utc::now(),
        }
    }
}
