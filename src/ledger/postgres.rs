//! PostgreSQL Ledger Store
//!
//! Every accessor is one statement. Balance changes go through
//! `UPDATE ... SET balance = balance + $2 ... RETURNING`, which takes the row
//! lock and applies the delta inside the database.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::error::StoreError;
use super::models::{Account, AccountId, Entry, EntryId, Transfer, TransferId};
use super::store::LedgerStore;

const ACCOUNT_COLUMNS: &str = "id, owner, currency, balance, created_at";

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = Transaction<'static, Postgres>;

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.rollback().await?;
        Ok(())
    }

    async fn insert_transfer(
        &self,
        tx: &mut Self::Tx,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        let transfer: Transfer = sqlx::query_as(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;

        Ok(transfer)
    }

    async fn insert_entry(
        &self,
        tx: &mut Self::Tx,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        let entry: Entry = sqlx::query_as(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;

        Ok(entry)
    }

    async fn get_account(&self, tx: &mut Self::Tx, id: AccountId) -> Result<Account, StoreError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", id)))
    }

    async fn add_to_balance(
        &self,
        tx: &mut Self::Tx,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError> {
        let sql = format!(
            "UPDATE accounts SET balance = balance + $2 WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", id)))
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        let transfer = sqlx::query_as(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transfer)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, StoreError> {
        let entry = sqlx::query_as(
            r#"SELECT id, account_id, amount, created_at FROM entries WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn list_entries(&self, account_id: AccountId) -> Result<Vec<Entry>, StoreError> {
        let entries = sqlx::query_as(
            r#"SELECT id, account_id, amount, created_at
               FROM entries WHERE account_id = $1 ORDER BY id"#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_transfers(
        &self,
        from: AccountId,
        to: AccountId,
    ) -> Result<Vec<Transfer>, StoreError> {
        let transfers = sqlx::query_as(
            r#"SELECT id, from_account_id, to_account_id, amount, created_at
               FROM transfers WHERE from_account_id = $1 AND to_account_id = $2
               ORDER BY id"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }
}
