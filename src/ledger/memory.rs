//! In-process Ledger Store
//!
//! Behaves like a row-locking database at read-committed isolation:
//! - `add_to_balance` takes the account's row lock and keeps it until the
//!   transaction commits, rolls back or is dropped
//! - uncommitted writes are only visible to their own transaction
//! - ids come from sequences that are never reused, even after rollback
//!
//! Used by the test suite and for running the engine without PostgreSQL.
//! Faults can be injected per step to exercise rollback paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

use super::error::StoreError;
use super::models::{Account, AccountId, Currency, Entry, EntryId, Transfer, TransferId};
use super::store::LedgerStore;

/// Step at which an injected failure fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Begin,
    InsertTransfer,
    InsertEntry,
    AddToBalance,
    Commit,
    /// Fires after the commit has been applied, as if the reply was lost
    CommitAcknowledgement,
}

#[derive(Default)]
struct Committed {
    accounts: HashMap<AccountId, Account>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
}

#[derive(Default)]
struct Inner {
    committed: Mutex<Committed>,
    row_locks: Mutex<HashMap<AccountId, Arc<tokio::sync::Mutex<()>>>>,
    faults: Mutex<HashMap<Fault, StoreError>>,
    lock_hold_delay: Mutex<Option<Duration>>,
    commit_delay: Mutex<Option<Duration>>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
    begun: AtomicUsize,
    committed_count: AtomicUsize,
    rolled_back: AtomicUsize,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open transaction on a [`MemoryLedgerStore`]
pub struct MemoryTx {
    locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    accounts: HashMap<AccountId, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl MemoryTx {
    /// Accounts whose row locks this transaction holds, ascending
    pub fn locked_accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.locks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Thread-safe in-memory ledger. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account outside any transfer
    pub fn create_account(&self, owner: &str, currency: Currency, balance: i64) -> Account {
        let id = self.inner.account_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let account = Account {
            id,
            owner: owner.to_string(),
            currency,
            balance,
            created_at: Utc::now(),
        };
        guard(&self.inner.row_locks).insert(id, Arc::new(tokio::sync::Mutex::new(())));
        guard(&self.inner.committed)
            .accounts
            .insert(id, account.clone());
        account
    }

    /// Committed state of an account
    pub fn account(&self, id: AccountId) -> Option<Account> {
        guard(&self.inner.committed).accounts.get(&id).cloned()
    }

    pub fn entry_count(&self) -> usize {
        guard(&self.inner.committed).entries.len()
    }

    pub fn transfer_count(&self) -> usize {
        guard(&self.inner.committed).transfers.len()
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> i64 {
        guard(&self.inner.committed)
            .accounts
            .values()
            .map(|a| a.balance)
            .sum()
    }

    /// Make the next call at `fault` fail with `err` (one-shot)
    pub fn inject_fault(&self, fault: Fault, err: StoreError) {
        guard(&self.inner.faults).insert(fault, err);
    }

    /// Sleep after taking a row lock, widening the window for lock conflicts
    pub fn set_lock_hold_delay(&self, delay: Option<Duration>) {
        *guard(&self.inner.lock_hold_delay) = delay;
    }

    /// Stall every commit before it is applied
    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        *guard(&self.inner.commit_delay) = delay;
    }

    pub fn begin_count(&self) -> usize {
        self.inner.begun.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.inner.committed_count.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.inner.rolled_back.load(Ordering::SeqCst)
    }

    fn take_fault(&self, fault: Fault) -> Result<(), StoreError> {
        match guard(&self.inner.faults).remove(&fault) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn row_lock(&self, id: AccountId) -> Result<Arc<tokio::sync::Mutex<()>>, StoreError> {
        guard(&self.inner.row_locks)
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account {}", id)))
    }

    fn account_exists(&self, id: AccountId) -> bool {
        guard(&self.inner.committed).accounts.contains_key(&id)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.take_fault(Fault::Begin)?;
        self.inner.begun.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTx {
            locks: HashMap::new(),
            accounts: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
        })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        let delay = *guard(&self.inner.commit_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Err(e) = self.take_fault(Fault::Commit) {
            self.inner.rolled_back.fetch_add(1, Ordering::SeqCst);
            return Err(e);
        }

        {
            let mut committed = guard(&self.inner.committed);
            for (id, account) in tx.accounts {
                committed.accounts.insert(id, account);
            }
            for entry in tx.entries {
                committed.entries.insert(entry.id, entry);
            }
            for transfer in tx.transfers {
                committed.transfers.insert(transfer.id, transfer);
            }
        }
        self.inner.committed_count.fetch_add(1, Ordering::SeqCst);
        // Row locks are released when `tx.locks` drops here
        self.take_fault(Fault::CommitAcknowledgement)
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        drop(tx);
        self.inner.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert_transfer(
        &self,
        tx: &mut Self::Tx,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.take_fault(Fault::InsertTransfer)?;
        if amount <= 0 || from == to {
            return Err(StoreError::Constraint(format!(
                "transfers check violated: from={} to={} amount={}",
                from, to, amount
            )));
        }
        for id in [from, to] {
            if !self.account_exists(id) {
                return Err(StoreError::Constraint(format!(
                    "transfers references missing account {}",
                    id
                )));
            }
        }

        let transfer = Transfer {
            id: self.inner.transfer_seq.fetch_add(1, Ordering::SeqCst) + 1,
            from_account_id: from,
            to_account_id: to,
            amount,
            created_at: Utc::now(),
        };
        tx.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn insert_entry(
        &self,
        tx: &mut Self::Tx,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        self.take_fault(Fault::InsertEntry)?;
        if !self.account_exists(account_id) {
            return Err(StoreError::Constraint(format!(
                "entries references missing account {}",
                account_id
            )));
        }

        let entry = Entry {
            id: self.inner.entry_seq.fetch_add(1, Ordering::SeqCst) + 1,
            account_id,
            amount,
            created_at: Utc::now(),
        };
        tx.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_account(&self, tx: &mut Self::Tx, id: AccountId) -> Result<Account, StoreError> {
        if let Some(account) = tx.accounts.get(&id) {
            return Ok(account.clone());
        }
        self.account(id)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", id)))
    }

    async fn add_to_balance(
        &self,
        tx: &mut Self::Tx,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError> {
        self.take_fault(Fault::AddToBalance)?;

        if !tx.locks.contains_key(&id) {
            let lock = self.row_lock(id)?;
            let row_guard = lock.lock_owned().await;
            tx.locks.insert(id, row_guard);

            let delay = *guard(&self.inner.lock_hold_delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        // With the row lock held, committed state for `id` cannot change under us
        let current = match tx.accounts.get(&id) {
            Some(account) => account.clone(),
            None => self
                .account(id)
                .ok_or_else(|| StoreError::NotFound(format!("account {}", id)))?,
        };
        let balance = current.balance.checked_add(delta).ok_or_else(|| {
            StoreError::Constraint(format!("balance out of range for account {}", id))
        })?;

        let updated = Account { balance, ..current };
        tx.accounts.insert(id, updated.clone());
        Ok(updated)
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Option<Transfer>, StoreError> {
        Ok(guard(&self.inner.committed).transfers.get(&id).cloned())
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>, StoreError> {
        Ok(guard(&self.inner.committed).entries.get(&id).cloned())
    }

    async fn list_entries(&self, account_id: AccountId) -> Result<Vec<Entry>, StoreError> {
        Ok(guard(&self.inner.committed)
            .entries
            .values()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_transfers(
        &self,
        from: AccountId,
        to: AccountId,
    ) -> Result<Vec<Transfer>, StoreError> {
        Ok(guard(&self.inner.committed)
            .transfers
            .values()
            .filter(|t| t.from_account_id == from && t.to_account_id == to)
            .cloned()
            .collect())
    }
}
