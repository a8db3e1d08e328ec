//! Password hashing

use thiserror::Error;

/// Password could not be hashed
#[derive(Debug, Error)]
#[error("Cannot hash password: {0}")]
pub struct HashError(#[from] bcrypt::BcryptError);

/// Hashing primitive for user passwords
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hashes a plaintext password, producing a new salt on every call
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Checks a plaintext password against a stored hash
    fn verify(&self, hash: &str, password: &str) -> bool;
}

/// Bcrypt password hasher
///
/// The cost factor is only used when hashing; verification reads it from the stored hash, so
/// hashes made with different costs remain valid.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Cheapest cost accepted, for tests and other throwaway hashes
    pub const MIN_COST: u32 = 4;

    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, hash: &str, password: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORDS: &[&str] = &["", "one", "the quick brown fox jumps over the lazy dog"];

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(BcryptHasher::MIN_COST)
    }

    #[test]
    fn hash_is_never_empty() {
        for password in PASSWORDS {
            assert!(!hasher().hash(password).unwrap().is_empty());
        }
    }

    #[test]
    fn verify_with_generated_hash() {
        for password in PASSWORDS {
            let hash = hasher().hash(password).unwrap();

            assert!(hasher().verify(&hash, password));
            assert!(!hasher().verify(&hash, "some-other-not-equal-password"));
        }
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hasher().hash("one").unwrap();
        let second = hasher().hash("one").unwrap();

        assert_ne!(first, second);
        assert!(hasher().verify(&first, "one"));
        assert!(hasher().verify(&second, "one"));
    }

    #[test]
    fn verify_with_malformed_hash_fails() {
        assert!(!hasher().verify("", ""));
        assert!(!hasher().verify("no-separator", "no-separator"));
        assert!(!hasher().verify("$2b$04$tooshort", "one"));
    }

    #[test]
    fn hash_embeds_cost() {
        let hash = hasher().hash("one").unwrap();
        assert!(hash.starts_with("$2b$04$"), "{hash}");

        let hash = BcryptHasher::new(5).hash("one").unwrap();
        assert!(hash.starts_with("$2b$05$"), "{hash}");
        assert!(hasher().verify(&hash, "one"));
    }

    #[test]
    fn default_cost_is_adaptive() {
        assert_eq!(BcryptHasher::default().cost(), bcrypt::DEFAULT_COST);
        assert!(BcryptHasher::default().cost() >= 10);
    }

    #[test]
    fn invalid_cost_is_an_error() {
        let _ = BcryptHasher::new(3).hash("one").unwrap_err();
        let _ = BcryptHasher::new(32).hash("one").unwrap_err();
    }
}
