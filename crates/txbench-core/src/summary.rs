//! Terminal report for a load run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::latency::{LatencyAggregator, Phase};

/// Aggregate result of one load run, computed exactly once when the
/// controller stops consuming completions and never mutated afterward.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Number of dispatch ticks that launched a worker.
    pub dispatched: u64,

    /// Number of worker completions consumed as successes before the
    /// deadline. In-flight workers abandoned at the deadline are not counted.
    pub succeeded: u64,

    /// Mean latency in seconds per phase, keyed by phase name.
    pub mean_latency_secs: BTreeMap<String, f64>,
}

impl RunSummary {
    /// Renders the summary from the run tallies and the latency aggregator.
    #[must_use]
    pub fn from_aggregator(
        dispatched: u64,
        succeeded: u64,
        latency: &LatencyAggregator,
    ) -> Self {
        let mean_latency_secs = Phase::ALL
            .iter()
            .map(|phase| (phase.as_str().to_string(), latency.mean_of(*phase)))
            .collect();

        Self {
            dispatched,
            succeeded,
            mean_latency_secs,
        }
    }

    /// Fraction of dispatched work that completed successfully, 0.0 when
    /// nothing was dispatched.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.dispatched == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.dispatched as f64
    }
}
