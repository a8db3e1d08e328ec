//! Service global context

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use color_eyre::Result;
use park::aggregate::Aggregator;
use park::auth::{BcryptHasher, SessionValidator};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

use crate::config;
use crate::store::SqliteStore;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Invalid SQLite path: {path}")]
    InvalidSQLitePath { path: PathBuf },
}

struct ContextInner {
    /// Database access
    db: SqlitePool,
    /// Rides reads
    rides: Aggregator,
    /// Session keys issuing and validation
    sessions: SessionValidator,
}

/// Context shared by all the request handlers
#[derive(Clone)]
pub struct Context(Arc<ContextInner>);

impl Context {
    /// Context for testing purposes - using the in-memory SQLite database
    pub async fn test() -> Result<Self> {
        let db = Self::memory_pool(1)?;
        sqlx::migrate!("model/migrations").run(&db).await?;

        Ok(Self::new(db, &config::Rides::default(), &config::Session::default()))
    }

    /// Context from configuration
    ///
    /// If the database is created in-memory, the migrations are being executed automatically. If database is
    /// file based migrations would be executed only if requested by configuration.
    pub async fn with_config(config: &config::Config) -> Result<Self> {
        use config::Database::*;

        let db = match &config.db {
            Memory { max_connections } => {
                let pool = Self::memory_pool(*max_connections)?;
                sqlx::migrate!("model/migrations").run(&pool).await?;
                pool
            }

            SqLite {
                path,
                max_connections,
                migrate,
            } => {
                let path = path
                    .as_path()
                    .to_str()
                    .ok_or_else(|| Error::InvalidSQLitePath { path: path.clone() })?;

                let opts = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .foreign_keys(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(*max_connections)
                    .connect_lazy_with(opts);

                if *migrate {
                    sqlx::migrate!("model/migrations").run(&pool).await?;
                }

                pool
            }
        };

        Ok(Self::new(db, &config.rides, &config.session))
    }

    fn new(db: SqlitePool, rides: &config::Rides, session: &config::Session) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));

        Self(Arc::new(ContextInner {
            db,
            rides: Aggregator::new(store.clone(), rides.timeout()),
            sessions: SessionValidator::new(store, Arc::new(BcryptHasher::default())).with_ttl(session.ttl()),
        }))
    }

    /// Pool over a fresh in-memory database shared by all its connections
    ///
    /// The database lives as long as any connection is open, so connections never expire.
    fn memory_pool(max_connections: u32) -> Result<SqlitePool> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(opts);

        Ok(pool)
    }

    /// Accesses the DB pool
    pub fn db(&self) -> &SqlitePool {
        &self.0.db
    }

    /// Access to rides aggregation
    pub fn rides(&self) -> &Aggregator {
        &self.0.rides
    }

    /// Access to session validation
    pub fn sessions(&self) -> &SessionValidator {
        &self.0.sessions
    }
}
