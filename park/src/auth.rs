//! Authentication data
//!
//! Users log in with their password and receive a [`SessionToken`]: the base64 encoded JSON form
//! of a [`SessionKey`], which pairs the user id with the password hash current at login time.
//! Nothing is stored server side on login. The [`SessionValidator`] checks a presented key against
//! the credential store and remembers a positive answer for a day, so a password change
//! invalidates outstanding keys once their cache entry runs out.

pub mod key;
pub mod password;
mod validator;

pub use key::{SessionKey, SessionToken};
pub use password::{BcryptHasher, HashError, PasswordHasher};
pub use validator::{MAX_SESSION_TTL, SESSION_TTL, SessionValidator};
