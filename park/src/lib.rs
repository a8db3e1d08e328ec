//! Theme park read core
//!
//! Two pieces live here: the [`Aggregator`](aggregate::Aggregator), which assembles rides with their
//! reviews and pictures by fanning child fetches out over a task group, and the
//! [`SessionValidator`](auth::SessionValidator), which issues session keys on login and keeps a
//! TTL cache of keys already checked against the credential store.
//!
//! Everything persistent is behind the [`store`] traits, so the core can run over SQLite in the
//! service and over [`MemoryStore`](store::memory::MemoryStore) in tests.

pub mod aggregate;
pub mod auth;
mod error;
pub mod model;
pub mod store;

pub use error::{Error, Result};
