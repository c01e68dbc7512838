//! Ledger Store
//!
//! Typed create/read/update access to accounts, entries and transfers. No
//! orchestration lives here: callers open a transaction with
//! [`LedgerStore::begin`] and pass it to every accessor.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use error::{ErrorKind, StoreError};
pub use memory::{Fault, MemoryLedgerStore, MemoryTx};
pub use models::{
    Account, AccountId, Currency, Entry, EntryId, Transfer, TransferId, TransferResult,
    UnsupportedCurrency,
};
pub use postgres::PgLedgerStore;
pub use store::LedgerStore;
