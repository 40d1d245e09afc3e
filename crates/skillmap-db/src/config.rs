use std::env;
use std::time::Duration;

/// Where the plan database lives and how the pool talks to it.
///
/// The URL comes from `SKILLMAP_DATABASE_URL` when set, else
/// `postgresql://localhost:5432/skillmap`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/skillmap";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "SKILLMAP_DATABASE_URL";

    /// Pool size for the service. One request holds at most one connection
    /// at a time, so this caps concurrent requests touching the store.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    pub fn from_env() -> Self {
        Self::new(env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()))
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Database name: the last path segment, without any query string.
    pub fn database_name(&self) -> Option<&str> {
        let (_, tail) = self.database_url.rsplit_once('/')?;
        let name = tail.split('?').next().unwrap_or(tail);
        (!name.is_empty()).then_some(name)
    }

    /// Same server and settings, different database.
    pub fn for_database(&self, name: &str) -> Self {
        let base = self
            .database_url
            .rsplit_once('/')
            .map_or(self.database_url.as_str(), |(base, _)| base);
        Self {
            database_url: format!("{base}/{name}"),
            ..self.clone()
        }
    }

    /// Single-connection config for the `postgres` maintenance database,
    /// used to create and drop plan databases.
    pub fn maintenance(&self) -> Self {
        Self {
            max_connections: 1,
            ..self.for_database("postgres")
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
