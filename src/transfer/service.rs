//! Transfer Service
//!
//! Caller-side wrapper around [`TransferEngine`]: validates a request against
//! current account state, then executes it, resubmitting only failures the
//! engine reports as retryable. Rollback guarantees make resubmission safe;
//! a commit whose outcome is unknown is never resubmitted.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::engine::TransferEngine;
use super::error::TransferError;
use crate::account::{AccountLookup, validate_transfer};
use crate::config::TransferConfig;
use crate::ledger::{AccountId, LedgerStore, TransferResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Minor units
    pub amount: i64,
    /// When set, the source account must belong to this owner
    #[serde(default)]
    pub owner: Option<String>,
}

impl TransferRequest {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

pub struct TransferService<S: LedgerStore, L: AccountLookup> {
    engine: TransferEngine<S>,
    lookup: L,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<S: LedgerStore, L: AccountLookup> TransferService<S, L> {
    pub fn new(engine: TransferEngine<S>, lookup: L, config: &TransferConfig) -> Self {
        Self {
            engine,
            lookup,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    pub async fn transfer(&self, req: &TransferRequest) -> Result<TransferResult, TransferError> {
        validate_transfer(&self.lookup, req).await?;

        let mut attempt: u32 = 0;
        loop {
            match self
                .engine
                .execute_transfer(req.from_account_id, req.to_account_id, req.amount)
                .await
            {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            transfer_id = result.transfer.id,
                            attempts = attempt + 1,
                            "Transfer succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Transient transfer failure, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
