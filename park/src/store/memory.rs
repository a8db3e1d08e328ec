//! In-memory store

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{Picture, Review, Ride, RideId, User, UserId};
use crate::store::{CredentialStore, EntityStore, StoreError, StoreResult};

/// Store keeping everything in process memory
///
/// Implements both collaborator traits. Rides are listed in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    rides: RwLock<Vec<Ride>>,
    reviews: RwLock<HashMap<RideId, Vec<Review>>>,
    pictures: RwLock<HashMap<RideId, Vec<Picture>>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ride, replacing one with the same id
    pub async fn insert_ride(&self, ride: Ride) {
        let mut rides = self.rides.write().await;
        match rides.iter_mut().find(|stored| stored.id == ride.id) {
            Some(stored) => *stored = ride,
            None => rides.push(ride),
        }
    }

    pub async fn insert_review(&self, review: Review) {
        self.reviews
            .write()
            .await
            .entry(review.ride_id.clone())
            .or_default()
            .push(review);
    }

    pub async fn insert_picture(&self, picture: Picture) {
        self.pictures
            .write()
            .await
            .entry(picture.ride_id.clone())
            .or_default()
            .push(picture);
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Replaces the password hash of an user, returning `false` if there is no such user
    pub async fn set_password_hash(&self, user_id: &UserId, password_hash: impl Into<String>) -> bool {
        match self.users.write().await.get_mut(user_id) {
            Some(user) => {
                user.password_hash = password_hash.into();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ride(&self, ride_id: &RideId) -> StoreResult<Ride> {
        self.rides
            .read()
            .await
            .iter()
            .find(|ride| &ride.id == ride_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Ride", ride_id))
    }

    async fn rides(&self) -> StoreResult<Vec<Ride>> {
        Ok(self.rides.read().await.clone())
    }

    async fn reviews_for_ride(&self, ride_id: &RideId) -> StoreResult<Vec<Review>> {
        let mut reviews = self
            .reviews
            .read()
            .await
            .get(ride_id)
            .cloned()
            .unwrap_or_default();
        reviews.sort_by_key(|review| Reverse(review.posted_on));
        Ok(reviews)
    }

    async fn pictures_for_ride(&self, ride_id: &RideId) -> StoreResult<Vec<Picture>> {
        Ok(self
            .pictures
            .read()
            .await
            .get(ride_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn user_by_id(&self, user_id: &UserId) -> StoreResult<User> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", user_id))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", email))
    }
}
