//! Rate-controlled dispatch and run control.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use txbench_core::{LatencyAggregator, LoadConfig, LoadResult, RunSummary};
use txbench_store::SqliteAccountRepository;

use crate::worker::TransactionWorker;

/// Amount credited by every synthetic transaction.
const INCREMENT: f64 = 1.0;

/// Profile of the shared account, fetched-or-created once per run.
const ACCOUNT_EMAIL: &str = "load@example.com";
const ACCOUNT_NICKNAME: &str = "txbench";

/// Owns one complete load run: pacing, dispatch, completion consumption, and
/// the terminal summary.
///
/// The run is a two-way race. A spawned dispatch task launches one worker per
/// scheduler tick without ever waiting on worker completion; the controller
/// loop consumes completion signals until the wall-clock deadline fires, then
/// stops consuming. In-flight workers are neither canceled nor joined: they
/// run to natural completion against the store, but completions arriving
/// after the deadline are never tallied.
pub struct LoadRunner {
    config: LoadConfig,
    pool: SqlitePool,
    latency: Arc<LatencyAggregator>,
}

impl LoadRunner {
    /// Creates a runner over an established pool and an explicitly
    /// constructed aggregator.
    pub fn new(config: LoadConfig, pool: SqlitePool, latency: Arc<LatencyAggregator>) -> Self {
        Self {
            config,
            pool,
            latency,
        }
    }

    /// Email of the shared account this runner credits.
    #[must_use]
    pub fn account_email() -> &'static str {
        ACCOUNT_EMAIL
    }

    /// Nickname of the shared account this runner credits.
    #[must_use]
    pub fn account_nickname() -> &'static str {
        ACCOUNT_NICKNAME
    }

    /// Runs one load run to its deadline and renders the summary.
    ///
    /// Only the inability to start (invalid configuration, failure to
    /// establish the shared account) surfaces as an error; per-worker
    /// failures are absorbed into the success tally.
    pub async fn run(&self) -> LoadResult<RunSummary> {
        self.config.validate()?;

        let accounts = SqliteAccountRepository::new(self.pool.clone());
        let account = accounts
            .fetch_or_create(ACCOUNT_EMAIL, ACCOUNT_NICKNAME)
            .await?;
        info!(
            account_id = account.account_id,
            balance = account.balance,
            "shared account ready"
        );

        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<bool>();
        let dispatched = Arc::new(AtomicU64::new(0));
        let worker = TransactionWorker::new(
            self.pool.clone(),
            account.account_id,
            INCREMENT,
            Arc::clone(&self.latency),
        );

        let dispatch_task = tokio::spawn(dispatch_loop(
            self.config.clone(),
            worker,
            completion_tx,
            Arc::clone(&dispatched),
        ));

        let mut succeeded = 0_u64;
        let deadline = tokio::time::sleep(self.config.run_duration());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                Some(success) = completion_rx.recv() => {
                    if success {
                        succeeded += 1;
                    }
                    debug!(success, "worker completion consumed");
                }
                _ = &mut deadline => {
                    // Deadline fired: stop consuming. In-flight workers keep
                    // executing but their completions are abandoned.
                    break;
                }
            }
        }

        dispatch_task.abort();
        let _ = dispatch_task.await;

        let summary = RunSummary::from_aggregator(
            dispatched.load(Ordering::SeqCst),
            succeeded,
            &self.latency,
        );
        info!(
            dispatched = summary.dispatched,
            succeeded = summary.succeeded,
            "load run complete"
        );
        Ok(summary)
    }
}

/// Emits dispatch ticks at the configured interval and launches one worker
/// task per tick, never waiting for a worker to finish before the next tick.
///
/// With `max_in_flight` unset the number of in-flight workers is unbounded
/// and grows with however many ticks fire while prior transactions are still
/// outstanding. When set, a semaphore permit is acquired before each launch
/// and released when the worker finishes, bounding concurrency at the cost of
/// delaying ticks once saturated.
async fn dispatch_loop(
    config: LoadConfig,
    worker: TransactionWorker,
    completion_tx: mpsc::UnboundedSender<bool>,
    dispatched: Arc<AtomicU64>,
) {
    let limiter = config
        .max_in_flight
        .map(|bound| Arc::new(Semaphore::new(bound)));

    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let permit: Option<OwnedSemaphorePermit> = match &limiter {
            Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return,
            },
            None => None,
        };

        let worker = worker.clone();
        let completion_tx = completion_tx.clone();
        tokio::spawn(async move {
            // A panicking worker must not take the dispatching context down
            // with it; the transaction rolls back on drop and the fault
            // becomes a plain failure signal.
            let outcome = std::panic::AssertUnwindSafe(worker.execute())
                .catch_unwind()
                .await;
            let success = match outcome {
                Ok(Ok(())) => true,
                Ok(Err(err)) => {
                    debug!(error = %err, "worker failed");
                    false
                }
                Err(_) => {
                    warn!("worker panicked; counted as failure");
                    false
                }
            };
            // The controller drops the receiver once the deadline fires.
            let _ = completion_tx.send(success);
            drop(permit);
        });

        dispatched.fetch_add(1, Ordering::SeqCst);
    }
}
