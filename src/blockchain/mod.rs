// Blockchain module
//
// This module contains the ledger engine:
// - Amounts and balances
// - Transaction structure and block snapshots
// - Block structure and proof of work
// - Blockchain structure (pending pool, mining, balances, validation)
// - Hashing utilities

pub mod amount;
pub mod block;
pub mod chain;
mod clock;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use amount::{Amount, Balance};
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, ChainInfo, ValidationError};
pub use crypto::Address;
pub use transaction::{Transaction, TransactionError, TransactionRecord};
