//! Ledger Store port
//!
//! Single-statement data access for accounts, entries and transfers. The
//! transaction handle is always passed explicitly; implementations keep no
//! "current transaction" of their own, so one store can serve any number of
//! concurrent transfers.

use async_trait::async_trait;

use super::error::StoreError;
use super::models::{Account, AccountId, Entry, EntryId, Transfer, TransferId};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open transaction. Dropping it without `commit` must discard its writes.
    type Tx: Send;

    /// Get store name for logging
    fn name(&self) -> &'static str;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn insert_transfer(
        &self,
        tx: &mut Self::Tx,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    async fn insert_entry(
        &self,
        tx: &mut Self::Tx,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError>;

    async fn get_account(&self, tx: &mut Self::Tx, id: AccountId) -> Result<Account, StoreError>;

    /// `balance = balance + delta` as one atomic update-and-return.
    ///
    /// Takes the account's row lock for the rest of the transaction.
    async fn add_to_balance(
        &self,
        tx: &mut Self::Tx,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError>;

    // === Committed-state reads (audit / verification) ===

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError>;

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, StoreError>;

    /// Entries for an account, oldest first
    async fn list_entries(&self, account_id: AccountId) -> Result<Vec<Entry>, StoreError>;

    /// Transfers between `from` and `to` in that direction, oldest first
    async fn list_transfers(
        &self,
        from: AccountId,
        to: AccountId,
    ) -> Result<Vec<Transfer>, StoreError>;
}
