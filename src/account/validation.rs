//! Pre-transfer validation
//!
//! Runs before the transfer engine is invoked: both accounts must exist,
//! share a currency, and (when an owner is given) the source must belong to
//! that owner. The engine itself only re-checks ids and amount.

use async_trait::async_trait;

use super::repository::AccountRepository;
use crate::ledger::{Account, AccountId, MemoryLedgerStore, StoreError};
use crate::transfer::{TransferError, TransferRequest, validate_request};

/// Read-only account lookup used for validation
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
impl AccountLookup for AccountRepository {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.get(id).await
    }
}

#[async_trait]
impl AccountLookup for MemoryLedgerStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.account(id))
    }
}

/// Validate a request and return the (source, destination) accounts as seen now.
///
/// Balances in the returned accounts are informational only; they may change
/// before the transfer runs.
pub async fn validate_transfer<L: AccountLookup + ?Sized>(
    lookup: &L,
    req: &TransferRequest,
) -> Result<(Account, Account), TransferError> {
    validate_request(req.from_account_id, req.to_account_id, req.amount)?;

    let from = lookup
        .find_account(req.from_account_id)
        .await
        .map_err(TransferError::Lookup)?
        .ok_or(TransferError::AccountNotFound(req.from_account_id))?;

    if let Some(owner) = &req.owner
        && from.owner != *owner
    {
        return Err(TransferError::NotOwner {
            account_id: from.id,
            owner: owner.clone(),
        });
    }

    let to = lookup
        .find_account(req.to_account_id)
        .await
        .map_err(TransferError::Lookup)?
        .ok_or(TransferError::AccountNotFound(req.to_account_id))?;

    if from.currency != to.currency {
        return Err(TransferError::CurrencyMismatch {
            from: from.currency,
            to: to.currency,
        });
    }

    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Currency;

    fn request(from: AccountId, to: AccountId, amount: i64) -> TransferRequest {
        TransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount,
            owner: None,
        }
    }

    #[tokio::test]
    async fn test_valid_request() {
        let store = MemoryLedgerStore::new();
        let a = store.create_account("alice", Currency::Usd, 100);
        let b = store.create_account("bob", Currency::Usd, 0);

        let (from, to) = validate_transfer(&store, &request(a.id, b.id, 10))
            .await
            .unwrap();
        assert_eq!(from.id, a.id);
        assert_eq!(to.id, b.id);
    }

    #[tokio::test]
    async fn test_missing_accounts() {
        let store = MemoryLedgerStore::new();
        let a = store.create_account("alice", Currency::Usd, 100);

        assert_eq!(
            validate_transfer(&store, &request(a.id, 77, 10)).await,
            Err(TransferError::AccountNotFound(77))
        );
        assert_eq!(
            validate_transfer(&store, &request(76, a.id, 10)).await,
            Err(TransferError::AccountNotFound(76))
        );
    }

    #[tokio::test]
    async fn test_currency_mismatch() {
        let store = MemoryLedgerStore::new();
        let a = store.create_account("alice", Currency::Usd, 100);
        let b = store.create_account("bob", Currency::Egp, 0);

        assert_eq!(
            validate_transfer(&store, &request(a.id, b.id, 10)).await,
            Err(TransferError::CurrencyMismatch {
                from: Currency::Usd,
                to: Currency::Egp
            })
        );
    }

    #[tokio::test]
    async fn test_owner_must_match_source() {
        let store = MemoryLedgerStore::new();
        let a = store.create_account("alice", Currency::Usd, 100);
        let b = store.create_account("bob", Currency::Usd, 0);

        let mut req = request(a.id, b.id, 10);
        req.owner = Some("bob".to_string());
        assert!(matches!(
            validate_transfer(&store, &req).await,
            Err(TransferError::NotOwner { .. })
        ));

        req.owner = Some("alice".to_string());
        assert!(validate_transfer(&store, &req).await.is_ok());
    }

    #[tokio::test]
    async fn test_degenerate_request_skips_lookup() {
        let store = MemoryLedgerStore::new();
        assert_eq!(
            validate_transfer(&store, &request(5, 5, 10)).await,
            Err(TransferError::SameAccount(5))
        );
        assert_eq!(
            validate_transfer(&store, &request(5, 6, 0)).await,
            Err(TransferError::InvalidAmount(0))
        );
    }
}
