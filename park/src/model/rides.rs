//! Rides and their child collections

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Newtype for ride id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(String);

impl RideId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RideId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RideId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Ride in the park
///
/// Scalar attributes come straight from the store. `pictures`, `reviews` and `reviews_average` are
/// filled by the aggregator for the duration of a single read and are never written back.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: RideId,
    pub name: String,
    pub description: String,
    pub min_age: i64,
    pub min_height: i64,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub pictures: Vec<Picture>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub reviews_average: i64,
}

impl Ride {
    /// Helper to create a ride with only the identifying attributes set
    pub fn new(id: impl Into<RideId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attaches reviews recomputing the average rating
    pub fn attach_reviews(&mut self, reviews: Vec<Review>) {
        self.reviews_average = reviews_average(&reviews);
        self.reviews = reviews;
    }
}

/// Average rating of the reviews with truncating division, `0` for no reviews
pub fn reviews_average(reviews: &[Review]) -> i64 {
    if reviews.is_empty() {
        return 0;
    }

    let total: i64 = reviews.iter().map(|review| review.rating).sum();
    total / reviews.len() as i64
}

/// Review written by an user for a ride
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub ride_id: RideId,
    pub user_id: String,
    /// Rating in `1..=5`
    pub rating: i64,
    pub title: String,
    pub content: String,
    pub posted_on: DateTime<Utc>,
}

/// Picture encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PictureFormat {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
}

impl std::str::FromStr for PictureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/gif" => Ok(Self::Gif),
            other => Err(format!("Unsupported picture format {other}")),
        }
    }
}

/// Picture attached to a ride
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub id: String,
    pub ride_id: RideId,
    pub format: PictureFormat,
    #[serde(serialize_with = "as_base64", deserialize_with = "from_base64")]
    pub data: Vec<u8>,
}

fn as_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64_STANDARD.encode(data))
}

fn from_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let encoded: String = Deserialize::deserialize(deserializer)?;
    BASE64_STANDARD
        .decode(encoded)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i64) -> Review {
        Review {
            id: format!("review-{rating}"),
            ride_id: "ride".into(),
            user_id: "user".to_owned(),
            rating,
            title: String::new(),
            content: String::new(),
            posted_on: Utc::now(),
        }
    }

    #[test]
    fn average_of_no_reviews_is_zero() {
        assert_eq!(reviews_average(&[]), 0);
    }

    #[test]
    fn average_truncates() {
        assert_eq!(reviews_average(&[review(5), review(3)]), 4);
        assert_eq!(reviews_average(&[review(5), review(4)]), 4);
        assert_eq!(reviews_average(&[review(1), review(2), review(2)]), 1);
        assert_eq!(reviews_average(&[review(4)]), 4);
    }

    #[test]
    fn attaching_reviews_updates_average() {
        let mut ride = Ride::new("ride", "Coaster");
        ride.reviews_average = 3;

        ride.attach_reviews(vec![]);
        assert_eq!(ride.reviews_average, 0);

        ride.attach_reviews(vec![review(5), review(2)]);
        assert_eq!(ride.reviews_average, 3);
        assert_eq!(ride.reviews.len(), 2);
    }

    #[test]
    fn ride_json_is_camel_case_with_base64_pictures() {
        let mut ride = Ride::new("ride", "Coaster");
        ride.min_age = 12;
        ride.pictures.push(Picture {
            id: "pic".to_owned(),
            ride_id: "ride".into(),
            format: PictureFormat::Png,
            data: vec![1, 2, 3],
        });

        let json = serde_json::to_value(&ride).unwrap();
        assert_eq!(json["minAge"], 12);
        assert_eq!(json["reviewsAverage"], 0);
        assert_eq!(json["pictures"][0]["format"], "image/png");
        assert_eq!(json["pictures"][0]["data"], "AQID");

        let back: Ride = serde_json::from_value(json).unwrap();
        assert_eq!(back, ride);
    }

    #[test]
    fn picture_format_parses_its_json_name() {
        for format in [PictureFormat::Jpeg, PictureFormat::Png, PictureFormat::Gif] {
            let serde_json::Value::String(name) = serde_json::to_value(format).unwrap() else {
                panic!("{format:?} is not serialized as a string");
            };
            assert_eq!(name.parse::<PictureFormat>().unwrap(), format);
        }

        let _ = "image/webp".parse::<PictureFormat>().unwrap_err();
    }
}
