//! Session key validation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::auth::{PasswordHasher, SessionKey, SessionToken};
use crate::model::{User, UserId};
use crate::store::{CredentialStore, StoreError};
use crate::{Error, Result};

/// How long a successful validation is trusted without asking the credential store again
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest validity cache TTL, longer ones are clamped to it
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Issues session keys and validates them against the credential store
///
/// Validity of keys is cached as `key -> expiry`. The cache is never swept: entries are only
/// overwritten when the same key is validated again after expiry, so it grows with the number of
/// distinct keys seen during the process lifetime. A failed validation does not remove an entry
/// either, hence a key issued before a password change stays valid until its entry expires.
pub struct SessionValidator {
    users: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    ttl: Duration,
    /// Validated keys with their expiration time
    expirations: Mutex<HashMap<SessionKey, Instant>>,
}

impl SessionValidator {
    pub fn new(users: Arc<dyn CredentialStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users,
            hasher,
            ttl: SESSION_TTL,
            expirations: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the validity cache TTL, clamped to [`MAX_SESSION_TTL`]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(MAX_SESSION_TTL),
            ..self
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verifies user password, returning a fresh session token on success
    ///
    /// The token is not cached; it is checked against the store on its first validation.
    #[instrument(skip(self, password))]
    pub async fn login(&self, user_id: &UserId, password: &str) -> Result<SessionToken> {
        let user = Self::known_user(self.users.user_by_id(user_id).await)?;
        self.issue(&user, password).await
    }

    /// Verifies password of the user with given email, returning the user id and a fresh session
    /// token on success
    #[instrument(skip(self, password))]
    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<(UserId, SessionToken)> {
        let (email, password) = (email.trim(), password.trim());
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let user = Self::known_user(self.users.user_by_email(email).await)?;
        let token = self.issue(&user, password).await?;
        Ok((user.id, token))
    }

    /// Validates a session token, returning the authorized user id
    ///
    /// Only a missing or expired cache entry makes this consult the credential store.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<UserId> {
        let key = SessionKey::decode(token)?;

        let cached = {
            let expirations = self.expirations.lock().await;
            expirations
                .get(&key)
                .is_some_and(|expires_at| Instant::now() < *expires_at)
        };

        if cached {
            debug!(user = %key.user_id, "Session key valid from cache");
            return Ok(key.user_id);
        }

        debug!(user = %key.user_id, "Session key not cached or expired, validating");
        let user = Self::known_user(self.users.user_by_id(&key.user_id).await)?;
        if user.password_hash != key.password_hash {
            warn!(user = %key.user_id, "Session key password hash outdated");
            return Err(Error::InvalidCredentials);
        }

        let user_id = key.user_id.clone();
        match Instant::now().checked_add(self.ttl) {
            Some(expires_at) => {
                self.expirations.lock().await.insert(key, expires_at);
            }
            None => warn!(user = %user_id, ttl = ?self.ttl, "Session expiry out of clock range, not caching"),
        }

        Ok(user_id)
    }

    /// Number of keys in the validity cache, expired ones included
    pub async fn cached_sessions(&self) -> usize {
        self.expirations.lock().await.len()
    }

    /// Resolves a credential store lookup, hiding whether the user exists
    fn known_user(user: Result<User, StoreError>) -> Result<User> {
        match user {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound { id, .. }) => {
                warn!(user = %id, "Unknown user");
                Err(Error::InvalidCredentials)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Verifies the password on the blocking pool
    async fn issue(&self, user: &User, password: &str) -> Result<SessionToken> {
        let hasher = self.hasher.clone();
        let (hash, password) = (user.password_hash.clone(), password.to_owned());
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&hash, &password)).await?;

        if !valid {
            warn!(user = %user.id, "Invalid password");
            return Err(Error::InvalidCredentials);
        }

        Ok(SessionKey::new(user.id.clone(), user.password_hash.clone()).encode())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::auth::BcryptHasher;
    use crate::store::StoreResult;
    use crate::store::memory::MemoryStore;

    const HASHER: BcryptHasher = BcryptHasher::new(BcryptHasher::MIN_COST);

    /// Credential store counting lookups, optionally failing all of them
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        lookups: AtomicUsize,
        unavailable: std::sync::atomic::AtomicBool,
    }

    impl CountingStore {
        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        fn lookup(&self) -> StoreResult<()> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("database is locked"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CredentialStore for CountingStore {
        async fn user_by_id(&self, user_id: &UserId) -> StoreResult<User> {
            self.lookup()?;
            self.inner.user_by_id(user_id).await
        }

        async fn user_by_email(&self, email: &str) -> StoreResult<User> {
            self.lookup()?;
            self.inner.user_by_email(email).await
        }
    }

    async fn setup() -> (Arc<CountingStore>, SessionValidator) {
        let store = Arc::new(CountingStore::default());
        store
            .inner
            .insert_user(User::new(
                "user1",
                "user1@park.test",
                HASHER.hash("password1").unwrap(),
            ))
            .await;

        let validator = SessionValidator::new(store.clone(), Arc::new(HASHER));
        (store, validator)
    }

    async fn change_password(store: &CountingStore, password: &str) {
        assert!(
            store
                .inner
                .set_password_hash(&"user1".into(), HASHER.hash(password).unwrap())
                .await
        );
    }

    #[tokio::test]
    async fn login_with_valid_password() {
        let (_, validator) = setup().await;

        let token = validator.login(&"user1".into(), "password1").await.unwrap();
        let key = token.key().unwrap();
        assert_eq!(key.user_id.as_str(), "user1");

        // Logging in does not populate the cache
        assert_eq!(validator.cached_sessions().await, 0);
    }

    #[tokio::test]
    async fn login_with_invalid_password_fails() {
        let (_, validator) = setup().await;

        let err = validator.login(&"user1".into(), "password2").await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials);

        let err = validator.login(&"user2".into(), "password1").await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials);
    }

    #[tokio::test]
    async fn login_with_email() {
        let (_, validator) = setup().await;

        let (user_id, token) = validator
            .login_with_email(" user1@park.test ", "password1")
            .await
            .unwrap();
        assert_eq!(user_id.as_str(), "user1");
        assert_eq!(validator.validate(token.as_str()).await.unwrap(), user_id);

        for (email, password) in [
            ("user1@park.test", ""),
            ("", "password1"),
            ("user1@park.test", "password2"),
            ("user2@park.test", "password1"),
        ] {
            let err = validator
                .login_with_email(email, password)
                .await
                .unwrap_err();
            assert_eq!(err, Error::InvalidCredentials, "{email}/{password}");
        }
    }

    #[tokio::test]
    async fn second_validation_is_served_from_cache() {
        let (store, validator) = setup().await;
        let token = validator.login(&"user1".into(), "password1").await.unwrap();
        let lookups = store.lookups();

        let user_id = validator.validate(token.as_str()).await.unwrap();
        assert_eq!(user_id.as_str(), "user1");
        assert_eq!(store.lookups(), lookups + 1);

        let user_id = validator.validate(token.as_str()).await.unwrap();
        assert_eq!(user_id.as_str(), "user1");
        assert_eq!(store.lookups(), lookups + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_revalidated_once() {
        let (store, validator) = setup().await;
        let token = validator.login(&"user1".into(), "password1").await.unwrap();

        validator.validate(token.as_str()).await.unwrap();
        let lookups = store.lookups();

        tokio::time::advance(SESSION_TTL - Duration::from_secs(1)).await;
        validator.validate(token.as_str()).await.unwrap();
        assert_eq!(store.lookups(), lookups);

        tokio::time::advance(Duration::from_secs(1)).await;
        validator.validate(token.as_str()).await.unwrap();
        assert_eq!(store.lookups(), lookups + 1);

        // Entry was refreshed by the revalidation
        validator.validate(token.as_str()).await.unwrap();
        assert_eq!(store.lookups(), lookups + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn password_change_invalidates_key_once_entry_expires() {
        let (store, validator) = setup().await;
        let old_token = validator.login(&"user1".into(), "password1").await.unwrap();
        validator.validate(old_token.as_str()).await.unwrap();

        change_password(&store, "password2").await;
        let new_token = validator.login(&"user1".into(), "password2").await.unwrap();
        assert_ne!(old_token, new_token);

        // The stale cache entry still vouches for the old key until it expires
        validator.validate(old_token.as_str()).await.unwrap();

        tokio::time::advance(SESSION_TTL).await;
        let err = validator.validate(old_token.as_str()).await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials);

        validator.validate(new_token.as_str()).await.unwrap();
    }

    #[tokio::test]
    async fn password_change_invalidates_uncached_key_immediately() {
        let (store, validator) = setup().await;
        let old_token = validator.login(&"user1".into(), "password1").await.unwrap();

        change_password(&store, "password2").await;

        let err = validator.validate(old_token.as_str()).await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials);
        assert_eq!(validator.cached_sessions().await, 0);
    }

    #[tokio::test]
    async fn forged_keys_fail() {
        let (_, validator) = setup().await;

        let unknown_user = SessionKey::new("user2".into(), "whatever").encode();
        let err = validator.validate(unknown_user.as_str()).await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials);

        let wrong_hash = SessionKey::new("user1".into(), "whatever").encode();
        let err = validator.validate(wrong_hash.as_str()).await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials);

        assert_eq!(validator.cached_sessions().await, 0);
    }

    #[tokio::test]
    async fn malformed_token_fails_without_store_lookup() {
        let (store, validator) = setup().await;

        let err = validator
            .validate("not-valid-base64-or-json")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)), "{err:?}");
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn store_outage_is_reported_and_not_cached() {
        let (store, validator) = setup().await;
        let token = validator.login(&"user1".into(), "password1").await.unwrap();

        store.unavailable.store(true, Ordering::SeqCst);
        let err = validator.validate(token.as_str()).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)), "{err:?}");
        assert_eq!(validator.cached_sessions().await, 0);

        store.unavailable.store(false, Ordering::SeqCst);
        validator.validate(token.as_str()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cache_keeps_every_validated_key() {
        let (store, validator) = setup().await;

        for _ in 0..3 {
            let token = validator.login(&"user1".into(), "password1").await.unwrap();
            validator.validate(token.as_str()).await.unwrap();
        }

        // Every login embeds the same hash, so the key (and the entry) is shared
        assert_eq!(validator.cached_sessions().await, 1);

        // Forged keys are not remembered
        let forged = SessionKey::new("user1".into(), HASHER.hash("password1").unwrap());
        let _ = validator.validate(forged.encode().as_str()).await.unwrap_err();
        assert_eq!(validator.cached_sessions().await, 1);

        // A password change adds a new entry next to the outdated one
        change_password(&store, "password2").await;
        let token = validator.login(&"user1".into(), "password2").await.unwrap();
        validator.validate(token.as_str()).await.unwrap();
        assert_eq!(validator.cached_sessions().await, 2);

        // Nothing is swept, expired entries stay until overwritten
        tokio::time::advance(SESSION_TTL * 2).await;
        assert_eq!(validator.cached_sessions().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_validations() {
        let (store, validator) = setup().await;
        let validator = Arc::new(validator);
        let token = validator.login(&"user1".into(), "password1").await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let validator = Arc::clone(&validator);
            let token = token.clone();
            tasks.spawn(async move { validator.validate(token.as_str()).await });
        }

        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap().as_str(), "user1");
        }

        assert_eq!(validator.cached_sessions().await, 1);
        // Racing cold validations may each reach the store, warm ones never do
        assert!((2..=33).contains(&store.lookups()));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_ttl() {
        let (store, validator) = setup().await;
        let validator = validator.with_ttl(Duration::from_secs(60));
        let token = validator.login(&"user1".into(), "password1").await.unwrap();

        validator.validate(token.as_str()).await.unwrap();
        let lookups = store.lookups();

        tokio::time::advance(Duration::from_secs(60)).await;
        validator.validate(token.as_str()).await.unwrap();
        assert_eq!(store.lookups(), lookups + 1);
    }

    #[tokio::test]
    async fn huge_ttl_is_clamped() {
        let (store, validator) = setup().await;
        let validator = validator.with_ttl(Duration::MAX);
        assert_eq!(validator.ttl(), MAX_SESSION_TTL);

        let token = validator.login(&"user1".into(), "password1").await.unwrap();
        let lookups = store.lookups();

        validator.validate(token.as_str()).await.unwrap();
        validator.validate(token.as_str()).await.unwrap();

        assert_eq!(store.lookups(), lookups + 1);
        assert_eq!(validator.cached_sessions().await, 1);
    }
}
