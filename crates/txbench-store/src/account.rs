use sqlx::sqlite::SqliteRow;
use sqlx::{query, Executor, Row, Sqlite, SqlitePool};
use txbench_core::{LoadError, LoadResult};

use crate::map_sqlx_error;

/// The shared mutable row every worker contends to credit.
///
/// The `balance` field is a snapshot of the committed value at read time; the
/// store is the sole source of truth, and balance updates go through
/// [`SqliteAccountRepository::credit_with_executor`] rather than a
/// read-modify-write of this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Primary key.
    pub account_id: i64,
    /// Contact address carried from the synthetic profile.
    pub email: String,
    /// Unique handle used to fetch-or-create the row.
    pub nickname: String,
    /// Committed balance at the time of the read.
    pub balance: f64,
}

/// SQLite-backed repository for the shared account.
pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    /// Creates a new repository backed by the provided pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool (useful for composing with other
    /// repositories).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetches the account with `nickname`, creating it with a zero balance
    /// when absent. Performed once before dispatch begins.
    pub async fn fetch_or_create(&self, email: &str, nickname: &str) -> LoadResult<Account> {
        query(
            r#"
            INSERT INTO accounts (email, nickname, balance)
            VALUES (?1, ?2, 0)
            ON CONFLICT (nickname) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(nickname)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", nickname.to_string(), err))?;

        let row = query(
            r#"
            SELECT account_id, email, nickname, balance
              FROM accounts
             WHERE nickname = ?1
            "#,
        )
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", nickname.to_string(), err))?;

        row.map(Self::map_row)
            .ok_or_else(|| LoadError::not_found("account", nickname.to_string()))
    }

    /// Applies `amount` to the stored balance via the supplied executor, so a
    /// worker can credit inside its own transaction. The increment happens at
    /// the store level; there is no in-process cached balance to drift from
    /// the committed value.
    pub async fn credit_with_executor<'e, E>(
        executor: E,
        account_id: i64,
        amount: f64,
    ) -> LoadResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = query(
            r#"
            UPDATE accounts
               SET balance = balance + ?2
             WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .execute(executor)
        .await
        .map_err(|err| map_sqlx_error("account", account_id.to_string(), err))?;

        if result.rows_affected() == 0 {
            return Err(LoadError::not_found("account", account_id.to_string()));
        }
        Ok(())
    }

    /// Committed balance as the store reports it.
    pub async fn balance(&self, account_id: i64) -> LoadResult<f64> {
        let row = query(
            r#"
            SELECT balance
              FROM accounts
             WHERE account_id = ?1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("account", account_id.to_string(), err))?;

        row.map(|row| row.get("balance"))
            .ok_or_else(|| LoadError::not_found("account", account_id.to_string()))
    }

    fn map_row(row: SqliteRow) -> Account {
        Account {
            account_id: row.get("account_id"),
            email: row.get("email"),
            nickname: row.get("nickname"),
            balance: row.get("balance"),
        }
    }
}
