//! Service configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing_subscriber::filter::Directive;

/// Logging output format
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Logging {
    /// Additional filtering directives
    #[serde(default, deserialize_with = "Logging::deserialize_filters")]
    pub filters: Vec<Directive>,

    /// Logging format
    #[serde(default)]
    pub format: LogFormat,
}

impl Logging {
    fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dirs: Vec<String> = Deserialize::deserialize(deserializer)?;
        dirs.into_iter()
            .map(|dir| dir.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Database {
    /// In-memory SQLite database, always migrated on startup
    Memory {
        #[serde(default = "Database::default_max_connections")]
        max_connections: u32,
    },
    /// File based SQLite database
    #[serde(rename = "sqlite")]
    SqLite {
        path: PathBuf,
        #[serde(default = "Database::default_max_connections")]
        max_connections: u32,
        /// Runs migrations on startup
        #[serde(default)]
        migrate: bool,
    },
}

impl Database {
    fn default_max_connections() -> u32 {
        1
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::Memory {
            max_connections: Self::default_max_connections(),
        }
    }
}

/// Rides aggregation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Rides {
    /// Deadline for fetching reviews and pictures of a single request, in milliseconds
    #[serde(default = "Rides::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Rides {
    fn default_timeout_ms() -> u64 {
        2000
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Rides {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Session validation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// How long a validated session key is trusted without checking the database
    #[serde(
        default = "Session::default_ttl_hours",
        deserialize_with = "Session::deserialize_ttl_hours"
    )]
    pub ttl_hours: u64,
}

impl Session {
    const SECS_PER_HOUR: u64 = 60 * 60;

    fn default_ttl_hours() -> u64 {
        24
    }

    fn deserialize_ttl_hours<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hours: u64 = Deserialize::deserialize(deserializer)?;
        let ttl = hours
            .checked_mul(Self::SECS_PER_HOUR)
            .map(Duration::from_secs)
            .ok_or_else(|| serde::de::Error::custom(format!("TTL of {hours} hours out of range")))?;

        if ttl > park::auth::MAX_SESSION_TTL {
            return Err(serde::de::Error::custom(format!(
                "TTL of {hours} hours exceeds {} hours",
                park::auth::MAX_SESSION_TTL.as_secs() / Self::SECS_PER_HOUR
            )));
        }

        Ok(hours)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(Self::SECS_PER_HOUR))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            ttl_hours: Self::default_ttl_hours(),
        }
    }
}

/// Top level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address where to host the service
    #[serde(default = "Config::default_host")]
    pub host: SocketAddr,

    /// Logging configuration
    #[serde(default)]
    pub logging: Logging,

    /// Database configuration
    #[serde(default)]
    pub db: Database,

    #[serde(default)]
    pub rides: Rides,

    #[serde(default)]
    pub session: Session,
}

impl Config {
    fn default_host() -> SocketAddr {
        ([127, 0, 0, 1], 5000).into()
    }
}
