//! Execution of one transactional unit of synthetic load.

use std::sync::Arc;
use std::time::Instant;

use sqlx::SqlitePool;
use tracing::debug;
use txbench_core::{LatencyAggregator, LoadError, LoadResult, Phase};
use txbench_store::{NewLedgerEntry, SqliteAccountRepository, SqliteLedgerRepository};

/// One independently scheduled execution of a full transactional work unit:
/// a ledger insert plus an account credit inside a single store transaction,
/// with per-phase latency recorded into the shared aggregator.
///
/// Workers carry no ordering guarantee relative to one another; the store's
/// transaction isolation is the only serialization between concurrent credits
/// of the shared account.
#[derive(Clone)]
pub struct TransactionWorker {
    pool: SqlitePool,
    account_id: i64,
    amount: f64,
    latency: Arc<LatencyAggregator>,
}

impl TransactionWorker {
    /// Creates a worker crediting `amount` to `account_id` per execution.
    pub fn new(
        pool: SqlitePool,
        account_id: i64,
        amount: f64,
        latency: Arc<LatencyAggregator>,
    ) -> Self {
        Self {
            pool,
            account_id,
            amount,
            latency,
        }
    }

    /// Runs the unit. Any error surfaces as a failure and rolls the
    /// transaction back (an uncommitted sqlx transaction rolls back when
    /// dropped); a failed attempt records no commit sample.
    pub async fn execute(&self) -> LoadResult<()> {
        let unit_start = Instant::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| LoadError::storage(err.to_string()))?;

        let entry = NewLedgerEntry::standard(self.account_id, self.amount);
        let phase_start = Instant::now();
        SqliteLedgerRepository::insert_with_executor(tx.as_mut(), &entry).await?;
        let elapsed = phase_start.elapsed().as_secs_f64();
        debug!(phase = %Phase::Create, elapsed_secs = elapsed, "phase complete");
        self.latency.record(Phase::Create, elapsed);

        let phase_start = Instant::now();
        SqliteAccountRepository::credit_with_executor(tx.as_mut(), self.account_id, self.amount)
            .await?;
        let elapsed = phase_start.elapsed().as_secs_f64();
        debug!(phase = %Phase::Save, elapsed_secs = elapsed, "phase complete");
        self.latency.record(Phase::Save, elapsed);

        tx.commit()
            .await
            .map_err(|err| LoadError::storage(err.to_string()))?;
        let elapsed = unit_start.elapsed().as_secs_f64();
        debug!(phase = %Phase::Commit, elapsed_secs = elapsed, "phase complete");
        self.latency.record(Phase::Commit, elapsed);
        Ok(())
    }
}
