//! Run configuration for the load harness.

use std::time::Duration;

use crate::error::{LoadError, LoadResult};

/// Immutable configuration for a single load run.
///
/// Built once at startup from the command line and frozen for the run's
/// lifetime; every component receives it by reference or clone.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Target dispatch rate in transactions per second.
    pub rate_per_second: u32,

    /// Wall-clock run duration in seconds.
    pub duration_secs: u64,

    /// Store connection URL (e.g. `sqlite:///path/to/txbench.db`).
    pub database_url: String,

    /// Maximum open connections in the store pool.
    pub max_connections: u32,

    /// Connections the pool keeps open when idle.
    pub min_connections: u32,

    /// Maximum lifetime of a pooled connection, if bounded.
    pub connection_lifetime_secs: Option<u64>,

    /// Upper bound on concurrently executing workers.
    ///
    /// `None` preserves unbounded dispatch: the dispatcher never waits for a
    /// worker to finish, so in-flight work grows with however many ticks have
    /// fired while prior transactions are still outstanding.
    pub max_in_flight: Option<usize>,
}

impl LoadConfig {
    /// Validates configuration values before the run starts.
    pub fn validate(&self) -> LoadResult<()> {
        if self.rate_per_second == 0 {
            return Err(LoadError::invalid_config("rate_per_second must be > 0"));
        }
        if self.duration_secs == 0 {
            return Err(LoadError::invalid_config("duration_secs must be > 0"));
        }
        if self.max_connections == 0 {
            return Err(LoadError::invalid_config("max_connections must be > 0"));
        }
        if self.min_connections > self.max_connections {
            return Err(LoadError::invalid_config(
                "min_connections must be <= max_connections",
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(LoadError::invalid_config(
                "max_in_flight must be > 0 when set",
            ));
        }
        Ok(())
    }

    /// Interval between dispatch ticks, derived from the target rate.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.rate_per_second
    }

    /// Total wall-clock duration of the run.
    #[must_use]
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Maximum pooled connection lifetime as a `Duration`, if bounded.
    #[must_use]
    pub fn connection_lifetime(&self) -> Option<Duration> {
        self.connection_lifetime_secs.map(Duration::from_secs)
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 1,
            duration_secs: 1,
            database_url: "sqlite://txbench.db".to_string(),
            max_connections: 1,
            min_connections: 1,
            connection_lifetime_secs: None,
            max_in_flight: None,
        }
    }
}
