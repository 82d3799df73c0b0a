use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use txbench_core::LoadConfig;

use crate::MIGRATOR;

/// Sizing and lifetime settings for the store connection pool.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum open connections.
    pub max_connections: u32,
    /// Connections the pool keeps open when idle.
    pub min_connections: u32,
    /// Maximum lifetime of a pooled connection, if bounded.
    pub connection_lifetime: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 8,
            min_connections: 1,
            connection_lifetime: None,
        }
    }
}

impl From<&LoadConfig> for PoolSettings {
    fn from(config: &LoadConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connection_lifetime: config.connection_lifetime(),
        }
    }
}

/// Creates a SQLite connection pool configured for concurrent transactional
/// load.
pub async fn create_pool(
    database_url: &str,
    settings: &PoolSettings,
) -> Result<SqlitePool, sqlx::Error> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let mut pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections);
    if let Some(lifetime) = settings.connection_lifetime {
        pool = pool.max_lifetime(lifetime);
    }

    pool.connect_with(options).await
}

/// Runs all outstanding migrations against the provided connection pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}
