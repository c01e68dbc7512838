//! gobank - Double-entry banking ledger
//!
//! The core is a transactional transfer engine: given a source account, a
//! destination account and an amount, it inserts one transfer row and two
//! entries and moves both balances inside a single database transaction,
//! safely under any number of concurrent transfers.
//!
//! # Modules
//!
//! - [`ledger`] - Ledger Store: models, store trait, PostgreSQL and in-memory stores
//! - [`transfer`] - Transfer Engine, its errors, and the caller-side service
//! - [`account`] - Account CRUD and pre-transfer validation
//! - [`db`] - PostgreSQL pool and migrations
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing setup

pub mod account;
pub mod config;
pub mod db;
pub mod ledger;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use ledger::{
    Account, AccountId, Currency, Entry, ErrorKind, LedgerStore, MemoryLedgerStore,
    PgLedgerStore, StoreError, Transfer, TransferResult,
};
pub use transfer::{TransferEngine, TransferError, TransferRequest, TransferService};
