//! Typed classification of backing-store failures
//!
//! Driver errors are translated here, at the store boundary, so callers above
//! never inspect SQLSTATE codes themselves.

use thiserror::Error;

/// How a failure should be treated by whoever owns retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request is malformed; fix it before resubmitting
    Validation,
    /// Conflict with a concurrent transaction; resubmitting is safe
    Transient,
    /// Business/integrity rule violated; resubmitting will fail again
    Constraint,
    /// Infrastructure failure
    Fatal,
    /// The store may or may not have applied the work; resubmitting could
    /// apply it twice
    Indeterminate,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient conflict: {0}")]
    Transient(String),

    /// Connection dropped while a statement was in flight
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) | StoreError::Constraint(_) => ErrorKind::Constraint,
            StoreError::Transient(_) | StoreError::ConnectionLost(_) => ErrorKind::Transient,
            StoreError::Unavailable(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Map a PostgreSQL SQLSTATE to the store taxonomy
pub(crate) fn classify_sqlstate(code: Option<&str>, message: String) -> StoreError {
    match code {
        // serialization_failure, deadlock_detected, lock_not_available, query_canceled
        Some("40001") | Some("40P01") | Some("55P03") | Some("57014") => {
            StoreError::Transient(message)
        }
        // admin/crash shutdown, cannot_connect_now
        Some("57P01") | Some("57P02") | Some("57P03") => StoreError::Unavailable(message),
        Some(c) if c.starts_with("23") => StoreError::Constraint(message),
        // numeric_value_out_of_range (balance overflow)
        Some("22003") => StoreError::Constraint(message),
        // connection_exception class
        Some(c) if c.starts_with("08") => StoreError::ConnectionLost(message),
        _ => StoreError::Unavailable(message),
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound(e.to_string()),
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                classify_sqlstate(code.as_deref(), e.to_string())
            }
            sqlx::Error::Io(_) => StoreError::ConnectionLost(e.to_string()),
            _ => StoreError::Unavailable(e.to_string()),
        }
    }
}
