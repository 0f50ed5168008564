use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock::next_timestamp;
use super::crypto::{meets_difficulty, sha256_hex};
use super::transaction::TransactionRecord;

/// Previous-hash value carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Index of the block in the chain
    pub index: u64,

    /// Timestamp when the block was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub created_at: DateTime<Utc>,

    /// Snapshots of the transactions included in this block
    pub transactions: Vec<TransactionRecord>,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Proof of work (nonce)
    pub nonce: u64,

    /// Hash of the current block (calculated)
    pub hash: String,
}

impl Block {
    /// Creates a new, unmined block
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transaction snapshots to include in the block
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// A new Block with nonce 0 and its hash already computed
    pub fn new(index: u64, transactions: Vec<TransactionRecord>, previous_hash: String) -> Self {
        Self::with_created_at(index, transactions, previous_hash, next_timestamp())
    }

    /// Creates a new, unmined block with an explicit creation time
    pub fn with_created_at(
        index: u64,
        transactions: Vec<TransactionRecord>,
        previous_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let block = Block {
            index,
            created_at,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };

        let hash = block.calculate_hash();

        Block { hash, ..block }
    }

    /// Calculates the hash of the block
    ///
    /// Covers every attribute except `hash` itself. Re-hashing an untouched
    /// block always reproduces the stored hash.
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        sha256_hex(&serde_json::json!({
            "index": self.index,
            "created_at": self.created_at,
            "transactions": self.transactions,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
        }))
    }

    /// Checks whether the stored hash still matches the block's contents
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Checks whether the stored hash satisfies `difficulty`
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Performs proof of work until the hash has `difficulty` leading zeros
    ///
    /// The search has no iteration bound. A difficulty of zero only refreshes
    /// the hash and leaves the nonce alone.
    pub fn mine(&mut self, difficulty: usize) {
        self.mine_until(difficulty, || false);
    }

    /// Performs proof of work, consulting `should_stop` once per nonce
    ///
    /// The hash is recomputed from the current contents before searching, so
    /// a block edited after an earlier seal is mined again.
    ///
    /// # Arguments
    ///
    /// * `difficulty` - Required number of leading zero hex digits
    /// * `should_stop` - Cancellation check; the search gives up when it returns true
    ///
    /// # Returns
    ///
    /// `true` if the block was sealed, `false` if the search was cancelled
    pub fn mine_until<F>(&mut self, difficulty: usize, mut should_stop: F) -> bool
    where
        F: FnMut() -> bool,
    {
        self.hash = self.calculate_hash();

        while !self.meets_difficulty(difficulty) {
            if should_stop() {
                debug!(
                    "Mining of block {} cancelled at nonce {}",
                    self.index, self.nonce
                );
                return false;
            }

            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.calculate_hash();
        }

        true
    }

    /// Display projection of the block
    pub fn to_json(&self) -> serde_json::Value {
        let transactions: Vec<serde_json::Value> = self
            .transactions
            .iter()
            .map(TransactionRecord::to_json)
            .collect();

        serde_json::json!({
            "index": self.index,
            "created_at": self.created_at,
            "transactions": transactions,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
            "hash": self.hash,
        })
    }
}
