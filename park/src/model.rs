//! Park data model

pub mod rides;
pub mod users;

pub use rides::{Picture, PictureFormat, Review, Ride, RideId};
pub use users::{User, UserId};
