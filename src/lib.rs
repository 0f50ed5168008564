//! An educational proof-of-work ledger.
//!
//! A [`Blockchain`] keeps an append-only list of blocks, each linked to its
//! predecessor by hash and sealed by a proof-of-work search. Transactions are
//! checked against balances derived from the chain, pooled, and mined into
//! the next block together with a reward for the miner.
//!
//! ```no_run
//! use pow_ledger::{Address, Amount, Blockchain, Transaction};
//!
//! let chain = Blockchain::new(2);
//! chain.mine_pending_transactions(&Address::from("Alice")).unwrap();
//!
//! let tx = Transaction::new(Some(Address::from("Alice")), Address::from("Bob"), Amount::coins(30));
//! chain.submit_transaction(tx).unwrap();
//! chain.mine_pending_transactions(&Address::from("Miner1")).unwrap();
//!
//! assert!(chain.is_chain_valid());
//! ```

pub mod api;
pub mod blockchain;
pub mod config;

pub use blockchain::{
    Address, Amount, Balance, Block, Blockchain, BlockchainError, ChainInfo, Transaction,
    TransactionRecord, ValidationError,
};
pub use config::LedgerConfig;
