//! Repository layer for account management
//!
//! Accounts are created with a zero balance; afterwards only the transfer
//! engine changes `balance`.

use sqlx::PgPool;

use crate::ledger::{Account, AccountId, Currency, StoreError};

const ACCOUNT_COLUMNS: &str = "id, owner, currency, balance, created_at";

/// Account repository for CRUD operations
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new account with zero balance
    ///
    /// Fails with a constraint error if `owner` already has an account in `currency`.
    pub async fn create(&self, owner: &str, currency: Currency) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (owner, currency, balance) VALUES ($1, $2, 0) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(owner)
            .bind(currency.as_str())
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(account_id = account.id, owner, %currency, "Account created");
        Ok(account)
    }

    /// Get account by ID
    pub async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Get an owner's account in a given currency
    pub async fn get_by_owner(
        &self,
        owner: &str,
        currency: Currency,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE owner = $1 AND currency = $2",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(owner)
            .bind(currency.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    pub async fn list_by_owner(
        &self,
        owner: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE owner = $1 ORDER BY id LIMIT $2 OFFSET $3",
            ACCOUNT_COLUMNS
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(owner)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts ORDER BY id LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }

    /// Delete an account. Returns false if it did not exist.
    ///
    /// Accounts referenced by entries or transfers cannot be deleted; that
    /// surfaces as a constraint error.
    pub async fn delete(&self, id: AccountId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
