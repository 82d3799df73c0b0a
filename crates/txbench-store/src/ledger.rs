use sqlx::{query, query_scalar, Executor, Sqlite, SqlitePool};
use txbench_core::LoadResult;

use crate::map_sqlx_error;

/// One immutable synthetic transaction fact, written once per worker
/// invocation and never updated or deleted.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    /// Account the entry references.
    pub account_id: i64,
    /// Upstream callback identifier.
    pub callback_id: String,
    /// External reference number.
    pub reference: String,
    /// Entry kind tag.
    pub kind: String,
    /// Short internal reference code.
    pub ref_code: String,
    /// Free-form metadata payload.
    pub data: String,
    /// Free-form comment.
    pub comment: String,
    /// Tenant label.
    pub tenant: String,
    /// Amount credited to the account.
    pub amount: f64,
}

impl NewLedgerEntry {
    /// The fixed synthetic record every worker writes, crediting `amount` to
    /// `account_id`. The descriptive fields are hardcoded; only the amount
    /// and the account reference vary per run.
    #[must_use]
    pub fn standard(account_id: i64, amount: f64) -> Self {
        Self {
            account_id,
            callback_id: "qwerty12345".to_string(),
            reference: "10101".to_string(),
            kind: "load".to_string(),
            ref_code: "txbench".to_string(),
            data: "some meta info".to_string(),
            comment: "some comment info".to_string(),
            tenant: "synthetic".to_string(),
            amount,
        }
    }
}

/// SQLite-backed repository for the append-only ledger.
pub struct SqliteLedgerRepository {
    pool: SqlitePool,
}

impl SqliteLedgerRepository {
    /// Creates a new repository backed by the provided pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts one ledger entry via the supplied executor, so a worker can
    /// write inside its own transaction.
    pub async fn insert_with_executor<'e, E>(executor: E, entry: &NewLedgerEntry) -> LoadResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        query(
            r#"
            INSERT INTO ledger_entries (
                account_id,
                callback_id,
                reference,
                kind,
                ref_code,
                data,
                comment,
                tenant,
                amount
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(entry.account_id)
        .bind(&entry.callback_id)
        .bind(&entry.reference)
        .bind(&entry.kind)
        .bind(&entry.ref_code)
        .bind(&entry.data)
        .bind(&entry.comment)
        .bind(&entry.tenant)
        .bind(entry.amount)
        .execute(executor)
        .await
        .map(|_| ())
        .map_err(|err| map_sqlx_error("ledger entry", entry.account_id.to_string(), err))
    }

    /// Number of ledger entries referencing `account_id`.
    pub async fn count_for_account(&self, account_id: i64) -> LoadResult<i64> {
        query_scalar(
            r#"
            SELECT COUNT(*)
              FROM ledger_entries
             WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("ledger entry", account_id.to_string(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteAccountRepository;
    use sqlx::sqlite::SqlitePoolOptions;
    use txbench_core::LoadError;

    async fn setup_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::MIGRATOR.run(&pool).await.unwrap();
        pool
    }

    async fn setup_account(pool: &SqlitePool) -> i64 {
        SqliteAccountRepository::new(pool.clone())
            .fetch_or_create("load@example.com", "txbench")
            .await
            .unwrap()
            .account_id
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let pool = setup_db().await;
        let account_id = setup_account(&pool).await;
        let repo = SqliteLedgerRepository::new(pool.clone());

        let entry = NewLedgerEntry::standard(account_id, 1.0);
        SqliteLedgerRepository::insert_with_executor(&pool, &entry)
            .await
            .unwrap();
        SqliteLedgerRepository::insert_with_executor(&pool, &entry)
            .await
            .unwrap();

        assert_eq!(repo.count_for_account(account_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_requires_existing_account() {
        let pool = setup_db().await;
        let repo = SqliteLedgerRepository::new(pool.clone());

        let entry = NewLedgerEntry::standard(4242, 1.0);
        let err = SqliteLedgerRepository::insert_with_executor(&pool, &entry)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Storage { .. }));
        assert_eq!(repo.count_for_account(4242).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let pool = setup_db().await;
        let account_id = setup_account(&pool).await;
        let repo = SqliteLedgerRepository::new(pool.clone());
        let accounts = SqliteAccountRepository::new(pool.clone());

        {
            let mut tx = pool.begin().await.unwrap();
            let entry = NewLedgerEntry::standard(account_id, 1.0);
            SqliteLedgerRepository::insert_with_executor(tx.as_mut(), &entry)
                .await
                .unwrap();
            SqliteAccountRepository::credit_with_executor(tx.as_mut(), account_id, 1.0)
                .await
                .unwrap();
            // Dropped without commit.
        }

        assert_eq!(repo.count_for_account(account_id).await.unwrap(), 0);
        assert_eq!(accounts.balance(account_id).await.unwrap(), 0.0);
    }
}
