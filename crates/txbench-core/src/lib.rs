//! Core domain types for the txbench load-generation harness.

pub mod config;
pub mod error;
pub mod latency;
pub mod summary;

pub use config::LoadConfig;
pub use error::{LoadError, LoadResult};
pub use latency::{LatencyAggregator, Phase};
pub use summary::RunSummary;
