//! SQLite backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use park::model::{Picture, Review, Ride, RideId, User, UserId};
use park::store::{CredentialStore, EntityStore, StoreError, StoreResult};
use sqlx::SqlitePool;

type RideRow = (String, String, String, i64, i64, f64, f64);
type ReviewRow = (String, String, String, i64, String, String, DateTime<Utc>);
type PictureRow = (String, String, String, Vec<u8>);
type UserRow = (String, String, String, DateTime<Utc>);

const SELECT_RIDES: &str =
    "select id, name, description, min_age, min_height, longitude, latitude from rides";

/// Store reading rides and users from the SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn ride((id, name, description, min_age, min_height, longitude, latitude): RideRow) -> Ride {
    Ride {
        id: id.into(),
        name,
        description,
        min_age,
        min_height,
        longitude,
        latitude,
        ..Default::default()
    }
}

fn user((id, email, password_hash, registered_on): UserRow) -> User {
    User {
        id: id.into(),
        email,
        password_hash,
        registered_on,
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn ride(&self, ride_id: &RideId) -> StoreResult<Ride> {
        let row: Option<RideRow> = sqlx::query_as(&format!("{SELECT_RIDES} where id = ?"))
            .bind(ride_id.as_str())
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::unavailable)?;

        row.map(ride)
            .ok_or_else(|| StoreError::not_found("Ride", ride_id))
    }

    async fn rides(&self) -> StoreResult<Vec<Ride>> {
        let rows: Vec<RideRow> = sqlx::query_as(&format!("{SELECT_RIDES} order by name, id"))
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::unavailable)?;

        Ok(rows.into_iter().map(ride).collect())
    }

    async fn reviews_for_ride(&self, ride_id: &RideId) -> StoreResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            "select id, ride_id, user_id, rating, title, content, posted_on from reviews
             where ride_id = ? order by posted_on desc",
        )
        .bind(ride_id.as_str())
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::unavailable)?;

        let reviews = rows
            .into_iter()
            .map(
                |(id, ride_id, user_id, rating, title, content, posted_on)| Review {
                    id,
                    ride_id: ride_id.into(),
                    user_id,
                    rating,
                    title,
                    content,
                    posted_on,
                },
            )
            .collect();
        Ok(reviews)
    }

    async fn pictures_for_ride(&self, ride_id: &RideId) -> StoreResult<Vec<Picture>> {
        let rows: Vec<PictureRow> = sqlx::query_as(
            "select id, ride_id, format, data from pictures where ride_id = ? order by position",
        )
        .bind(ride_id.as_str())
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::unavailable)?;

        rows.into_iter()
            .map(|(id, ride_id, format, data)| -> StoreResult<Picture> {
                Ok(Picture {
                    id,
                    ride_id: ride_id.into(),
                    format: format.parse().map_err(StoreError::unavailable)?,
                    data,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn user_by_id(&self, user_id: &UserId) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "select id, email, password_hash, registered_on from users where id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::unavailable)?;

        row.map(user)
            .ok_or_else(|| StoreError::not_found("User", user_id))
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "select id, email, password_hash, registered_on from users where email = ?",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::unavailable)?;

        row.map(user)
            .ok_or_else(|| StoreError::not_found("User", email))
    }
}
