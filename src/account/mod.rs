//! Account management module
//!
//! PostgreSQL-backed account CRUD and the validation callers run before
//! handing a request to the transfer engine.

pub mod repository;
pub mod validation;

// Re-export commonly used types
pub use repository::AccountRepository;
pub use validation::{AccountLookup, validate_transfer};
