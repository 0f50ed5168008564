use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::amount::Amount;
use super::clock::next_timestamp;
use super::crypto::{sha256_hex, Address};

/// Reasons a transaction fails its local validity check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Sender and recipient are the same address: {0}")]
    SelfTransfer(Address),

    #[error("Amount must be greater than zero")]
    ZeroAmount,
}

/// A value transfer waiting to be mined.
///
/// Transactions are immutable once built. A missing sender marks a
/// system-issued transfer such as a mining reward, which debits nobody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address, absent for system-issued transfers
    sender: Option<Address>,

    /// Recipient's address
    recipient: Address,

    /// Amount being transferred
    amount: Amount,

    /// Timestamp when the transaction was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// Nothing is validated here; call [`Transaction::is_valid`] or let the
    /// chain reject it on submission.
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender, `None` for a system-issued transfer
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    pub fn new(sender: Option<Address>, recipient: Address, amount: Amount) -> Self {
        Self::with_created_at(sender, recipient, amount, next_timestamp())
    }

    /// Creates a system-issued transaction (mining reward)
    pub fn reward(recipient: Address, amount: Amount) -> Self {
        Self::new(None, recipient, amount)
    }

    /// Creates a transaction with an explicit creation time
    pub fn with_created_at(
        sender: Option<Address>,
        recipient: Address,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Self {
        Transaction {
            sender,
            recipient,
            amount,
            created_at,
        }
    }

    pub fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Checks if the transaction is system-issued
    pub fn is_reward(&self) -> bool {
        self.sender.is_none()
    }

    /// Calculates the hash of the transaction
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the transaction as a hexadecimal string
    pub fn content_hash(&self) -> String {
        transaction_hash(
            self.sender.as_ref(),
            &self.recipient,
            self.amount,
            &self.created_at,
        )
    }

    /// Checks the transaction's shape, naming the first rule it breaks
    pub fn validate(&self) -> Result<(), TransactionError> {
        if let Some(sender) = &self.sender {
            if *sender == self.recipient {
                return Err(TransactionError::SelfTransfer(sender.clone()));
            }
        }

        if self.amount.is_zero() {
            return Err(TransactionError::ZeroAmount);
        }

        Ok(())
    }

    /// Validates the transaction
    ///
    /// # Returns
    ///
    /// `false` if sender and recipient are the same or the amount is zero
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Takes the snapshot that gets embedded in a block
    pub fn to_record(&self) -> TransactionRecord {
        TransactionRecord {
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            amount: self.amount,
            created_at: self.created_at,
        }
    }

    /// Display projection including the derived hash
    pub fn to_json(&self) -> serde_json::Value {
        self.to_record().to_json()
    }
}

/// A transaction as stored inside a block.
///
/// Records are plain data, detached from the [`Transaction`] they were taken
/// from. Their fields are public so tamper detection can be demonstrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    pub sender: Option<Address>,

    pub recipient: Address,

    pub amount: Amount,

    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Same digest as [`Transaction::content_hash`] for an untouched record
    pub fn content_hash(&self) -> String {
        transaction_hash(
            self.sender.as_ref(),
            &self.recipient,
            self.amount,
            &self.created_at,
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sender": self.sender,
            "recipient": self.recipient,
            "amount": self.amount,
            "created_at": self.created_at,
            "hash": self.content_hash(),
        })
    }
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        transaction.to_record()
    }
}

fn transaction_hash(
    sender: Option<&Address>,
    recipient: &Address,
    amount: Amount,
    created_at: &DateTime<Utc>,
) -> String {
    sha256_hex(&serde_json::json!({
        "sender": sender,
        "recipient": recipient,
        "amount": amount,
        "created_at": created_at,
    }))
}
