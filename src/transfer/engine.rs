//! Transfer Engine
//!
//! Moves money between two accounts as one database transaction:
//!
//! ```text
//! begin → insert transfer → debit entry → credit entry
//!       → add_to_balance(lower id) → add_to_balance(higher id) → commit
//! ```
//!
//! Balance rows are always locked in ascending account id order, whichever
//! side is the source. Two transfers touching the same pair of accounts
//! therefore queue on the same first lock and can never wait on each other in
//! a cycle.
//!
//! The engine is stateless: all coordination is left to the store's row
//! locks. It never retries; see [`TransferService`](super::service::TransferService).

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::error::{TransferError, TransferStep};
use crate::ledger::{Account, AccountId, LedgerStore, TransferResult};

/// Reject degenerate requests before any transaction is opened
pub fn validate_request(from: AccountId, to: AccountId, amount: i64) -> Result<(), TransferError> {
    if from == to {
        return Err(TransferError::SameAccount(from));
    }
    if amount <= 0 {
        return Err(TransferError::InvalidAmount(amount));
    }
    Ok(())
}

/// Order two `(account, delta)` updates by ascending account id
pub fn lock_order(a: (AccountId, i64), b: (AccountId, i64)) -> [(AccountId, i64); 2] {
    if a.0 <= b.0 { [a, b] } else { [b, a] }
}

pub struct TransferEngine<S: LedgerStore> {
    store: Arc<S>,
    tx_timeout: Duration,
}

impl<S: LedgerStore> Clone for TransferEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tx_timeout: self.tx_timeout,
        }
    }
}

impl<S: LedgerStore> TransferEngine<S> {
    /// `tx_timeout` bounds how long the transaction may stay open before it is
    /// rolled back.
    pub fn new(store: Arc<S>, tx_timeout: Duration) -> Self {
        Self { store, tx_timeout }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Execute one transfer atomically.
    ///
    /// On any error the transaction is rolled back and nothing is committed.
    /// Dropping the returned future before it resolves drops the open
    /// transaction, which the store also discards.
    pub async fn execute_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferResult, TransferError> {
        validate_request(from, to, amount)?;

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| TransferError::store(TransferStep::Begin, e))?;

        // One deadline bounds the whole transaction, commit included
        let deadline = Instant::now() + self.tx_timeout;

        let applied =
            tokio::time::timeout_at(deadline, self.apply(&mut tx, from, to, amount)).await;

        let result = match applied {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                self.abort(tx, &e).await;
                return Err(e);
            }
            Err(_) => {
                let e = TransferError::Timeout(self.tx_timeout);
                self.abort(tx, &e).await;
                return Err(e);
            }
        };

        let committed = match tokio::time::timeout_at(deadline, self.store.commit(tx)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransferError::store(TransferStep::Commit, e)),
            // The commit may already be on the wire; dropping it closes the connection
            Err(_) => Err(TransferError::CommitTimeout(self.tx_timeout)),
        };
        if let Err(e) = committed {
            warn!(
                transfer_id = result.transfer.id,
                error = %e,
                kind = ?e.kind(),
                retryable = e.is_retryable(),
                store = self.store.name(),
                "Commit failed"
            );
            return Err(e);
        }

        info!(
            transfer_id = result.transfer.id,
            from = from,
            to = to,
            amount = amount,
            from_balance = result.from_account.balance,
            to_balance = result.to_account.balance,
            "Transfer committed"
        );
        Ok(result)
    }

    async fn apply(
        &self,
        tx: &mut S::Tx,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferResult, TransferError> {
        let transfer = self
            .store
            .insert_transfer(tx, from, to, amount)
            .await
            .map_err(|e| TransferError::store(TransferStep::InsertTransfer, e))?;
        debug!(transfer_id = transfer.id, "Transfer row inserted");

        let from_entry = self
            .store
            .insert_entry(tx, from, -amount)
            .await
            .map_err(|e| TransferError::store(TransferStep::InsertDebitEntry, e))?;

        let to_entry = self
            .store
            .insert_entry(tx, to, amount)
            .await
            .map_err(|e| TransferError::store(TransferStep::InsertCreditEntry, e))?;

        let [(first_id, first_delta), (second_id, second_delta)] =
            lock_order((from, -amount), (to, amount));
        let first = self.update_balance(tx, first_id, first_delta).await?;
        let second = self.update_balance(tx, second_id, second_delta).await?;

        let (from_account, to_account) = if first.id == from {
            (first, second)
        } else {
            (second, first)
        };

        Ok(TransferResult {
            transfer,
            from_entry,
            to_entry,
            from_account,
            to_account,
        })
    }

    async fn update_balance(
        &self,
        tx: &mut S::Tx,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, TransferError> {
        let account = self
            .store
            .add_to_balance(tx, account_id, delta)
            .await
            .map_err(|e| TransferError::store(TransferStep::UpdateBalance(account_id), e))?;
        debug!(account_id, delta, balance = account.balance, "Balance updated");
        Ok(account)
    }

    async fn abort(&self, tx: S::Tx, cause: &TransferError) {
        warn!(
            error = %cause,
            retryable = cause.is_retryable(),
            store = self.store.name(),
            "Rolling back transfer"
        );
        if let Err(e) = self.store.rollback(tx).await {
            // The store discards the transaction on its own once the handle is gone
            error!(error = %e, "Rollback failed");
        }
    }
}
