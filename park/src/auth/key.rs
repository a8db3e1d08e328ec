//! Session key codec

use base64::prelude::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::model::UserId;
use crate::{Error, Result};

/// Session key data
///
/// Two keys are equal only if both the user and the password hash snapshot are equal, which makes
/// the key itself usable as the validity cache key.
#[derive(Derivative, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct SessionKey {
    /// User authorized by this key
    #[serde(rename = "login")]
    pub user_id: UserId,
    /// Password hash of the user at the time of login
    #[serde(rename = "passwordHash")]
    #[derivative(Debug = "ignore")]
    pub password_hash: String,
}

impl SessionKey {
    pub fn new(user_id: UserId, password_hash: impl Into<String>) -> Self {
        Self {
            user_id,
            password_hash: password_hash.into(),
        }
    }

    /// Encodes the key as an opaque token
    pub fn encode(&self) -> SessionToken {
        // Two string fields with no custom serializers, serialization cannot fail
        let json = serde_json::to_vec(self).expect("Session key is plain strings");
        SessionToken(BASE64_STANDARD.encode(json))
    }

    /// Decodes the key from its token form
    pub fn decode(token: &str) -> Result<Self> {
        let json = BASE64_STANDARD
            .decode(token)
            .map_err(|err| Error::MalformedToken(err.to_string()))?;

        serde_json::from_slice(&json).map_err(|err| Error::MalformedToken(err.to_string()))
    }
}

/// Newtype for the session token string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the key carried by this token
    pub fn key(&self) -> Result<SessionKey> {
        SessionKey::decode(&self.0)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionToken {
    type Err = Error;

    /// Accepts only strings which decode into a session key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionKey::decode(s)?;
        Ok(Self(s.to_owned()))
    }
}
