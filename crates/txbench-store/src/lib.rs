//! SQLite persistence adapters for the txbench load harness.

mod account;
mod ledger;
mod pool;

pub use account::{Account, SqliteAccountRepository};
pub use ledger::{NewLedgerEntry, SqliteLedgerRepository};
pub use pool::{create_pool, run_migrations, PoolSettings};

use txbench_core::LoadError;

/// Embedded SQL migrations for the load-harness schema.
pub const MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub(crate) fn map_sqlx_error(entity: &'static str, id: String, err: sqlx::Error) -> LoadError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            if message.contains("UNIQUE constraint failed") {
                LoadError::storage(format!("{entity} `{id}` already exists"))
            } else {
                LoadError::storage(message)
            }
        }
        other => LoadError::storage(other.to_string()),
    }
}
