use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use txbench_core::{LatencyAggregator, LoadConfig};
use txbench_engine::LoadRunner;
use txbench_store::{create_pool, run_migrations, PoolSettings, SqliteAccountRepository};

#[derive(Parser, Debug)]
#[command(name = "txbench")]
#[command(about = "Transactional load-generation harness", long_about = None)]
#[command(version)]
struct Cli {
    /// Store connection URL
    #[arg(
        long,
        env = "TXBENCH_DATABASE_URL",
        default_value = "sqlite://txbench.db"
    )]
    database_url: String,

    /// Target dispatch rate in transactions per second
    #[arg(long, env = "TXBENCH_RATE", default_value = "1")]
    rate: u32,

    /// Run duration in seconds
    #[arg(long, env = "TXBENCH_DURATION", default_value = "1")]
    duration: u64,

    /// Maximum open connections in the store pool
    #[arg(long, default_value = "1")]
    connections: u32,

    /// Connections the pool keeps open when idle
    #[arg(long, default_value = "1")]
    idle: u32,

    /// Maximum pooled connection lifetime in seconds
    #[arg(long)]
    lifetime: Option<u64>,

    /// Upper bound on concurrently executing workers (unbounded when unset)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> LoadConfig {
        LoadConfig {
            rate_per_second: self.rate,
            duration_secs: self.duration,
            database_url: self.database_url,
            max_connections: self.connections,
            min_connections: self.idle,
            connection_lifetime_secs: self.lifetime,
            max_in_flight: self.max_in_flight,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.json);

    let config = args.into_config();
    config.validate().context("invalid run configuration")?;

    info!(
        rate = config.rate_per_second,
        duration_secs = config.duration_secs,
        database_url = %config.database_url,
        connections = config.max_connections,
        idle = config.min_connections,
        "starting load run"
    );

    let pool = create_pool(&config.database_url, &PoolSettings::from(&config))
        .await
        .context("failed to connect to the store")?;
    run_migrations(&pool)
        .await
        .context("failed to apply schema migrations")?;

    let latency = Arc::new(LatencyAggregator::new());
    let runner = LoadRunner::new(config, pool.clone(), latency);
    let summary = runner.run().await.context("load run failed to start")?;

    let accounts = SqliteAccountRepository::new(pool);
    let account = accounts
        .fetch_or_create(LoadRunner::account_email(), LoadRunner::account_nickname())
        .await
        .context("failed to read the final balance")?;

    info!(
        dispatched = summary.dispatched,
        succeeded = summary.succeeded,
        success_rate = summary.success_rate(),
        balance = account.balance,
        summary = %serde_json::to_string(&summary).context("failed to render summary")?,
        "load run finished"
    );

    Ok(())
}

/// Initialize logging
fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_target(false);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
