use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::amount::{Amount, Balance};
use super::block::{Block, GENESIS_PREVIOUS_HASH};
use super::crypto::Address;
use super::transaction::{Transaction, TransactionError};
use crate::config::ChainConfig;

/// Recipient credited by the genesis block
pub const GENESIS_ADDRESS: &str = "genesis";

/// Default number of leading zero hex digits required of a mined block
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Default amount paid to whoever mines a block
pub const DEFAULT_MINING_REWARD: Amount = Amount::coins(100);

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("Insufficient funds for {sender}: required {required}, available {available}")]
    InsufficientFunds {
        sender: Address,
        required: Amount,
        available: Balance,
    },

    #[error("Mining cancelled before a valid nonce was found")]
    MiningCancelled,

    /// The genesis block is created with the chain, so this only shows up
    /// after some other invariant has already been broken.
    #[error("Internal error: the chain has no blocks")]
    EmptyChain,
}

/// The first problem found while walking the chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Block {index} hash is invalid")]
    HashMismatch { index: usize },

    #[error("Block {index} is not linked correctly")]
    BrokenLink { index: usize },

    #[error("Block {index} doesn't meet difficulty requirement")]
    DifficultyNotMet { index: usize },

    #[error("Genesis block is malformed: {0}")]
    InvalidGenesis(&'static str),

    #[error("The chain has no blocks")]
    EmptyChain,
}

impl ValidationError {
    /// Index of the offending block, if the error points at one
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::HashMismatch { index }
            | ValidationError::BrokenLink { index }
            | ValidationError::DifficultyNotMet { index } => Some(*index),
            ValidationError::InvalidGenesis(_) => Some(0),
            ValidationError::EmptyChain => None,
        }
    }
}

/// Summary statistics of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChainInfo {
    /// Number of blocks, genesis included
    pub blocks: usize,

    /// Leading zero hex digits required of mined blocks
    pub difficulty: usize,

    /// Transactions waiting for the next block
    pub pending_transactions: usize,

    /// Result of validating the chain
    pub is_valid: bool,
}

#[derive(Debug)]
struct LedgerState {
    blocks: Vec<Block>,
    pending_transactions: Vec<Transaction>,
}

/// Represents the blockchain
///
/// Handles are cheap to clone and share one ledger. Blocks and the pending
/// pool sit behind a single lock; a second lock admits one miner at a time.
/// The nonce search itself runs with the ledger unlocked, so submissions and
/// balance queries are served while a block is being sealed.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks and the pending transactions
    state: Arc<Mutex<LedgerState>>,

    /// Held for the whole of a mining operation
    mining: Arc<Mutex<()>>,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: usize,

    /// Mining reward
    mining_reward: Amount,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block
    ///
    /// # Arguments
    ///
    /// * `difficulty` - Number of leading zero hex digits a mined block's hash needs
    pub fn new(difficulty: usize) -> Self {
        Self::with_settings(difficulty, DEFAULT_MINING_REWARD)
    }

    /// Creates a new blockchain from configuration
    pub fn with_config(config: &ChainConfig) -> Self {
        Self::with_settings(config.difficulty, config.mining_reward)
    }

    /// Creates a new blockchain with an explicit mining reward
    pub fn with_settings(difficulty: usize, mining_reward: Amount) -> Self {
        let blockchain = Blockchain {
            state: Arc::new(Mutex::new(LedgerState {
                blocks: vec![Self::genesis_block()],
                pending_transactions: Vec::new(),
            })),
            mining: Arc::new(Mutex::new(())),
            difficulty,
            mining_reward,
        };

        info!(
            "Genesis block created (difficulty {}, mining reward {})",
            difficulty, mining_reward
        );

        blockchain
    }

    /// Creates the genesis block (first block in the chain)
    ///
    /// It credits a zero amount to [`GENESIS_ADDRESS`] and is never mined.
    fn genesis_block() -> Block {
        let genesis_transaction = Transaction::reward(Address::from(GENESIS_ADDRESS), Amount::ZERO);

        Block::new(
            0,
            vec![genesis_transaction.to_record()],
            GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn mining_reward(&self) -> Amount {
        self.mining_reward
    }

    /// Number of blocks in the chain, genesis included
    pub fn block_count(&self) -> usize {
        self.state.lock().blocks.len()
    }

    /// Gets the last block in the chain
    pub fn latest_block(&self) -> Result<Block, BlockchainError> {
        let state = self.state.lock();
        state.blocks.last().cloned().ok_or_else(empty_chain)
    }

    /// Gets the entire blockchain
    pub fn get_chain(&self) -> Vec<Block> {
        self.state.lock().blocks.clone()
    }

    /// Gets all pending transactions
    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.state.lock().pending_transactions.clone()
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// The transaction is rejected when it fails [`Transaction::validate`] or
    /// when its sender's balance, as recorded in mined blocks, is below the
    /// amount. System-issued transactions skip the balance check.
    ///
    /// The balance check is advisory: funds are not reserved for pending
    /// transactions, so several transactions from one sender may each pass
    /// against the same balance and jointly overdraw it once mined.
    ///
    /// # Arguments
    ///
    /// * `transaction` - The transaction to add
    ///
    /// # Returns
    ///
    /// Result with the index of the block that will include this transaction
    pub fn submit_transaction(&self, transaction: Transaction) -> Result<u64, BlockchainError> {
        if let Err(err) = transaction.validate() {
            warn!("Invalid transaction rejected: {}", err);
            return Err(err.into());
        }

        let mut state = self.state.lock();

        if let Some(sender) = transaction.sender() {
            let available = balance_in(&state.blocks, sender);
            if !available.covers(transaction.amount()) {
                warn!(
                    "Insufficient balance for {}: {} < {}",
                    sender,
                    available,
                    transaction.amount()
                );
                return Err(BlockchainError::InsufficientFunds {
                    sender: sender.clone(),
                    required: transaction.amount(),
                    available,
                });
            }
        }

        info!(
            "Transaction added: {} -> {}: {}",
            transaction
                .sender()
                .map_or_else(|| "<system>".to_string(), Address::to_string),
            transaction.recipient(),
            transaction.amount()
        );
        state.pending_transactions.push(transaction);

        Ok(state.blocks.len() as u64)
    }

    /// Mines all pending transactions into a new block
    ///
    /// A reward transaction paying [`Blockchain::mining_reward`] to
    /// `reward_address` is appended to the block. Blocks until proof of work
    /// is found.
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub fn mine_pending_transactions(&self, reward_address: &Address) -> Result<Block, BlockchainError> {
        self.mine_pending_transactions_until(reward_address, &AtomicBool::new(false))
    }

    /// Mines all pending transactions, giving up once `cancel` is set
    ///
    /// A cancelled run appends nothing and leaves the pending pool as it was,
    /// so it is always safe to retry. Transactions submitted while the search
    /// runs stay pending for the next block.
    pub fn mine_pending_transactions_until(
        &self,
        reward_address: &Address,
        cancel: &AtomicBool,
    ) -> Result<Block, BlockchainError> {
        let _permit = self.mining.lock();

        let (mut block, mined_count) = {
            let state = self.state.lock();
            let latest = state.blocks.last().ok_or_else(empty_chain)?;

            let mut records: Vec<_> = state
                .pending_transactions
                .iter()
                .map(Transaction::to_record)
                .collect();
            records.push(Transaction::reward(reward_address.clone(), self.mining_reward).to_record());

            let block = Block::new(state.blocks.len() as u64, records, latest.hash.clone());
            (block, state.pending_transactions.len())
        };

        info!(
            "Mining block {} with {} transactions...",
            block.index,
            block.transactions.len()
        );
        if !block.mine_until(self.difficulty, || cancel.load(Ordering::Relaxed)) {
            warn!("Mining of block {} cancelled", block.index);
            return Err(BlockchainError::MiningCancelled);
        }

        let mut state = self.state.lock();
        state.pending_transactions.drain(..mined_count);
        state.blocks.push(block.clone());

        info!(
            "Block {} mined with nonce {}: {}",
            block.index, block.nonce, block.hash
        );
        Ok(block)
    }

    /// Calculates the balance of an address from every transaction in the chain
    ///
    /// Pending transactions are not counted.
    pub fn get_balance(&self, address: &Address) -> Balance {
        balance_in(&self.state.lock().blocks, address)
    }

    /// Validates every block after genesis, reporting the first failure
    ///
    /// For each block this checks, in order, that the stored hash matches the
    /// contents, that it points at its predecessor's hash and that the hash
    /// meets the difficulty. The chain itself is never modified.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_blocks(&self.state.lock().blocks, self.difficulty)
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if the blockchain is valid, false otherwise
    pub fn is_chain_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!("Chain validation failed: {}", err);
                false
            }
        }
    }

    /// Like [`Blockchain::validate`], but also checks the genesis block
    pub fn audit(&self) -> Result<(), ValidationError> {
        let state = self.state.lock();
        let genesis = state.blocks.first().ok_or(ValidationError::EmptyChain)?;

        if genesis.index != 0 {
            return Err(ValidationError::InvalidGenesis("index is not 0"));
        }
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return Err(ValidationError::InvalidGenesis("previous hash is not \"0\""));
        }
        if !genesis.has_valid_hash() {
            return Err(ValidationError::InvalidGenesis("hash does not match contents"));
        }

        validate_blocks(&state.blocks, self.difficulty)
    }

    /// Gets blockchain statistics
    pub fn chain_info(&self) -> ChainInfo {
        let state = self.state.lock();

        ChainInfo {
            blocks: state.blocks.len(),
            difficulty: self.difficulty,
            pending_transactions: state.pending_transactions.len(),
            is_valid: validate_blocks(&state.blocks, self.difficulty).is_ok(),
        }
    }

    /// Applies `tamper` to an appended block without resealing it
    ///
    /// Nothing in the ledger calls this. It exists so demonstrations and
    /// tests can corrupt a block and watch validation catch it.
    ///
    /// `tamper` runs while the ledger lock is held. The lock is not
    /// reentrant, so calling back into this `Blockchain` (or a clone of it)
    /// from inside `tamper` deadlocks.
    ///
    /// # Returns
    ///
    /// false if there is no block at `index`
    pub fn tamper_block<F>(&self, index: usize, tamper: F) -> bool
    where
        F: FnOnce(&mut Block),
    {
        let mut state = self.state.lock();
        match state.blocks.get_mut(index) {
            Some(block) => {
                warn!("Block {} is being tampered with", index);
                tamper(block);
                true
            }
            None => false,
        }
    }
}

fn empty_chain() -> BlockchainError {
    error!("Chain has no blocks; the genesis invariant was violated");
    BlockchainError::EmptyChain
}

fn balance_in(blocks: &[Block], address: &Address) -> Balance {
    let mut balance = Balance::ZERO;

    for record in blocks.iter().flat_map(|block| &block.transactions) {
        if record.sender.as_ref() == Some(address) {
            balance.debit(record.amount);
        }

        if &record.recipient == address {
            balance.credit(record.amount);
        }
    }

    balance
}

fn validate_blocks(blocks: &[Block], difficulty: usize) -> Result<(), ValidationError> {
    if blocks.is_empty() {
        return Err(ValidationError::EmptyChain);
    }

    for (index, pair) in blocks.windows(2).enumerate() {
        let (previous_block, current_block) = (&pair[0], &pair[1]);
        let index = index + 1;

        if !current_block.has_valid_hash() {
            return Err(ValidationError::HashMismatch { index });
        }

        if current_block.previous_hash != previous_block.hash {
            return Err(ValidationError::BrokenLink { index });
        }

        if !current_block.meets_difficulty(difficulty) {
            return Err(ValidationError::DifficultyNotMet { index });
        }
    }

    Ok(())
}
