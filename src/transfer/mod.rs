//! Transactional Transfer Engine
//!
//! Moves an amount between two accounts of the ledger with double-entry
//! bookkeeping, as a single database transaction.
//!
//! # Flow
//!
//! ```text
//! caller → TransferService (validate, retry policy)
//!        → TransferEngine::execute_transfer
//!        → LedgerStore: begin → transfer → entries → balances → commit/rollback
//! ```
//!
//! # Invariants
//!
//! 1. **All or nothing**: a transfer row, its two entries and both balance
//!    updates commit together or not at all
//! 2. **Atomic balance arithmetic**: balances change only via
//!    `balance = balance + delta` in the store, never read-modify-write here
//! 3. **Ascending lock order**: balance rows are updated lower account id first
//! 4. **No retries in the engine**: only the caller decides to resubmit

pub mod engine;
pub mod error;
pub mod service;


// Re-exports for convenience
pub use engine::{TransferEngine, lock_order, validate_request};
pub use error::{TransferError, TransferStep};
pub use service::{TransferRequest, TransferService};
