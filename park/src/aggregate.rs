//! Ride aggregation
//!
//! A ride read from the store carries only its scalar attributes. The [`Aggregator`] completes it
//! with reviews and pictures and recomputes `reviews_average`. For a batch of rides every child
//! fetch is spawned as its own task in a single [`JoinSet`], and one merge loop drains the set in
//! completion order under one shared deadline. The first failure (or the deadline) shuts the whole
//! set down and fails the batch: callers never see a listing with some rides left unaggregated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::model::rides::reviews_average;
use crate::model::{Picture, Review, Ride, RideId};
use crate::store::EntityStore;
use crate::{Error, Result};

/// Deadline used by [`Aggregator::ride`] and [`Aggregator::rides`] unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Child collections fetched for every ride of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expand {
    /// Reviews and pictures attached, average computed
    Full,
    /// Reviews fetched only to compute the average
    Ratings,
}

/// Result of a single child fetch, delivered to the merge loop
enum Fetched {
    Reviews(RideId, Vec<Review>),
    Pictures(RideId, Vec<Picture>),
}

impl Fetched {
    fn ride_id(&self) -> &RideId {
        match self {
            Self::Reviews(ride_id, _) | Self::Pictures(ride_id, _) => ride_id,
        }
    }
}

/// Assembles rides with their child collections
pub struct Aggregator {
    store: Arc<dyn EntityStore>,
    /// Deadline for the aggregation part of `ride` and `rides`
    timeout: Duration,
}

impl Aggregator {
    pub fn new(store: Arc<dyn EntityStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Fetches a single ride with its reviews, pictures and average rating
    #[instrument(skip(self))]
    pub async fn ride(&self, ride_id: &RideId) -> Result<Ride> {
        let ride = self.store.ride(ride_id).await?;
        self.aggregate_one(ride, self.timeout).await
    }

    /// Fetches all rides, each with its reviews, pictures and average rating
    #[instrument(skip(self))]
    pub async fn rides(&self) -> Result<Vec<Ride>> {
        let rides = self.store.rides().await?;
        self.aggregate_children(rides, self.timeout).await
    }

    /// Completes every ride with reviews, pictures and average rating
    ///
    /// Two fetches are spawned per ride, with no cap on the number of tasks in flight. `deadline`
    /// bounds the whole batch. Ride order is preserved regardless of completion order.
    pub async fn aggregate_children(&self, rides: Vec<Ride>, deadline: Duration) -> Result<Vec<Ride>> {
        self.fan_out(rides, Expand::Full, deadline).await
    }

    /// Computes average rating of every ride, leaving child collections empty
    pub async fn aggregate_ratings(&self, rides: Vec<Ride>, deadline: Duration) -> Result<Vec<Ride>> {
        self.fan_out(rides, Expand::Ratings, deadline).await
    }

    /// Completes a single ride, fetching its reviews and pictures one after another
    #[instrument(skip_all, fields(ride = %ride.id))]
    pub async fn aggregate_one(&self, mut ride: Ride, deadline: Duration) -> Result<Ride> {
        let fetch = async {
            let reviews = self.store.reviews_for_ride(&ride.id).await?;
            let pictures = self.store.pictures_for_ride(&ride.id).await?;
            Ok::<_, Error>((reviews, pictures))
        };

        let (reviews, pictures) = timeout(deadline, fetch).await.map_err(|_| {
            warn!(?deadline, "Aggregation deadline exceeded");
            Error::DeadlineExceeded
        })??;

        ride.attach_reviews(reviews);
        ride.pictures = pictures;
        Ok(ride)
    }

    #[instrument(skip_all, fields(rides = rides.len(), expand = ?expand))]
    async fn fan_out(
        &self,
        mut rides: Vec<Ride>,
        expand: Expand,
        deadline: Duration,
    ) -> Result<Vec<Ride>> {
        // Positions are resolved through this index only; it is not modified after spawning.
        let mut index: HashMap<RideId, Vec<usize>> = HashMap::with_capacity(rides.len());
        for (position, ride) in rides.iter().enumerate() {
            index.entry(ride.id.clone()).or_default().push(position);
        }

        let mut tasks = JoinSet::new();
        for ride_id in index.keys() {
            let store = Arc::clone(&self.store);
            let id = ride_id.clone();
            tasks.spawn(async move {
                let reviews = store.reviews_for_ride(&id).await?;
                Ok::<_, Error>(Fetched::Reviews(id, reviews))
            });

            if expand == Expand::Full {
                let store = Arc::clone(&self.store);
                let id = ride_id.clone();
                tasks.spawn(async move {
                    let pictures = store.pictures_for_ride(&id).await?;
                    Ok(Fetched::Pictures(id, pictures))
                });
            }
        }

        let mut remaining = tasks.len();
        debug!(tasks = remaining, "Child fetches spawned");

        let collect = async {
            while remaining > 0 {
                let Some(joined) = tasks.join_next().await else {
                    break;
                };
                remaining -= 1;
                merge(&mut rides, &index, joined??, expand);
            }
            Ok::<_, Error>(())
        };

        let outcome = timeout(deadline, collect).await;
        match outcome {
            Ok(Ok(())) => Ok(rides),
            Ok(Err(err)) => {
                warn!(%err, pending = remaining, "Child fetch failed, cancelling the batch");
                tasks.shutdown().await;
                Err(err)
            }
            Err(_) => {
                warn!(pending = remaining, ?deadline, "Aggregation deadline exceeded, cancelling the batch");
                tasks.shutdown().await;
                Err(Error::DeadlineExceeded)
            }
        }
    }
}

/// Writes a child fetch result onto every ride with its id
fn merge(rides: &mut [Ride], index: &HashMap<RideId, Vec<usize>>, fetched: Fetched, expand: Expand) {
    let Some(positions) = index.get(fetched.ride_id()) else {
        debug!(ride = %fetched.ride_id(), "Dropping child fetch result for an unknown ride");
        return;
    };

    match fetched {
        Fetched::Reviews(ride_id, reviews) => {
            let average = reviews_average(&reviews);
            debug!(ride = %ride_id, reviews = reviews.len(), average, "Reviews merged");
            for &position in positions {
                let ride = &mut rides[position];
                ride.reviews_average = average;
                if expand == Expand::Full {
                    ride.reviews = reviews.clone();
                }
            }
        }
        Fetched::Pictures(ride_id, pictures) => {
            debug!(ride = %ride_id, pictures = pictures.len(), "Pictures merged");
            for &position in positions {
                rides[position].pictures = pictures.clone();
            }
        }
    }
}
