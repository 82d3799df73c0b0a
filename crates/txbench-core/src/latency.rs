//! Per-phase latency sample collection.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

/// Named sub-step of a transactional work unit whose latency is measured
/// separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Inserting the ledger entry inside the transaction.
    Create,
    /// Crediting the shared account inside the transaction.
    Save,
    /// The full unit, recorded after a successful commit.
    Commit,
}

impl Phase {
    /// All phases, in the order a worker passes through them.
    pub const ALL: [Phase; 3] = [Phase::Create, Phase::Save, Phase::Commit];

    /// Stable lowercase name used in reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Save => "save",
            Phase::Commit => "commit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe accumulator of per-phase latency samples.
///
/// Constructed explicitly and shared via `Arc`; the backing sample store is
/// owned exclusively by the aggregator and only reachable through `record`
/// and the read-side aggregate methods. Samples are kept for the run's
/// lifetime; there is no windowing or eviction.
#[derive(Debug, Default)]
pub struct LatencyAggregator {
    samples: Mutex<HashMap<Phase, Vec<f64>>>,
}

impl LatencyAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one sample for `phase`. Safe to call concurrently from any
    /// number of workers.
    pub fn record(&self, phase: Phase, elapsed_secs: f64) {
        self.samples.lock().entry(phase).or_default().push(elapsed_secs);
    }

    /// Arithmetic mean over all samples recorded for `phase` so far.
    ///
    /// Returns `0.0` when no samples exist for the phase, so a run that never
    /// reached a phase still renders a finite report.
    #[must_use]
    pub fn mean_of(&self, phase: Phase) -> f64 {
        let samples = self.samples.lock();
        match samples.get(&phase) {
            Some(values) if !values.is_empty() => {
                values.iter().sum::<f64>() / values.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Number of samples recorded for `phase` so far.
    #[must_use]
    pub fn sample_count(&self, phase: Phase) -> usize {
        self.samples
            .lock()
            .get(&phase)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
