//! Transfer Error Types

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::ledger::{AccountId, Currency, ErrorKind, StoreError};

/// Step of the transfer transaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Begin,
    InsertTransfer,
    InsertDebitEntry,
    InsertCreditEntry,
    UpdateBalance(AccountId),
    Commit,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStep::Begin => f.write_str("begin transaction"),
            TransferStep::InsertTransfer => f.write_str("insert transfer"),
            TransferStep::InsertDebitEntry => f.write_str("insert debit entry"),
            TransferStep::InsertCreditEntry => f.write_str("insert credit entry"),
            TransferStep::UpdateBalance(id) => write!(f, "update balance of account {}", id),
            TransferStep::Commit => f.write_str("commit"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("Source and destination account cannot be the same (account {0})")]
    SameAccount(AccountId),

    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(i64),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Currency mismatch: source is {from}, destination is {to}")]
    CurrencyMismatch { from: Currency, to: Currency },

    #[error("Account {account_id} does not belong to {owner}")]
    NotOwner { account_id: AccountId, owner: String },

    // === Store Errors ===
    #[error("Account lookup failed: {0}")]
    Lookup(#[source] StoreError),

    #[error("Transfer failed at {step}: {source}")]
    Store {
        step: TransferStep,
        #[source]
        source: StoreError,
    },

    #[error("Transfer transaction exceeded {0:?} and was rolled back")]
    Timeout(Duration),

    #[error("Commit not acknowledged within {0:?}; transfer may or may not be durable")]
    CommitTimeout(Duration),
}

impl TransferError {
    pub fn store(step: TransferStep, source: StoreError) -> Self {
        TransferError::Store { step, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::SameAccount(_)
            | TransferError::InvalidAmount(_)
            | TransferError::AccountNotFound(_)
            | TransferError::CurrencyMismatch { .. }
            | TransferError::NotOwner { .. } => ErrorKind::Validation,
            // The server may have made the commit durable before the connection went away
            TransferError::Store {
                step: TransferStep::Commit,
                source: StoreError::ConnectionLost(_),
            } => ErrorKind::Indeterminate,
            TransferError::Lookup(source) | TransferError::Store { source, .. } => source.kind(),
            TransferError::Timeout(_) => ErrorKind::Transient,
            TransferError::CommitTimeout(_) => ErrorKind::Indeterminate,
        }
    }

    /// Whether resubmitting the identical request is safe and may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::SameAccount(_) => "SAME_ACCOUNT",
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferError::NotOwner { .. } => "NOT_OWNER",
            TransferError::Timeout(_) => "TIMEOUT",
            TransferError::CommitTimeout(_) => "OUTCOME_UNKNOWN",
            TransferError::Lookup(_) | TransferError::Store { .. } => match self.kind() {
                ErrorKind::Transient => "CONFLICT",
                ErrorKind::Constraint | ErrorKind::Validation => "CONSTRAINT_VIOLATION",
                ErrorKind::Fatal => "DATABASE_ERROR",
                ErrorKind::Indeterminate => "OUTCOME_UNKNOWN",
            },
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::SameAccount(_)
            | TransferError::InvalidAmount(_)
            | TransferError::CurrencyMismatch { .. } => 400,
            TransferError::NotOwner { .. } => 403,
            TransferError::AccountNotFound(_) => 404,
            TransferError::Timeout(_) => 503,
            TransferError::CommitTimeout(_) => 504,
            TransferError::Lookup(_) | TransferError::Store { .. } => match self.kind() {
                ErrorKind::Transient => 409,
                ErrorKind::Constraint | ErrorKind::Validation => 422,
                ErrorKind::Fatal => 500,
                ErrorKind::Indeterminate => 504,
            },
        }
    }
}
