use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::Address;

/// Sender address used for newly minted coins
pub const REWARD_SENDER: &str = "0";

/// Amount credited to the miner of each block
pub const MINING_REWARD: u64 = 1;

/// Errors that can occur when building a transaction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// A transfer of `amount` coins from `sender` to `recipient`
///
/// Transactions carry no signature; ownership of the sender address is
/// checked by the identity service before a transaction reaches the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    /// Sender's address
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: u64,
}

impl Transaction {
    /// Creates a new transaction, rejecting a zero amount
    pub fn new(sender: Address, recipient: Address, amount: u64) -> Result<Self, TransactionError> {
        if amount == 0 {
            return Err(TransactionError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        Ok(Transaction {
            sender,
            recipient,
            amount,
        })
    }

    /// Creates the reward transaction paid to the miner of a block
    pub fn new_reward(recipient: Address) -> Self {
        Transaction {
            sender: Address(REWARD_SENDER.to_string()),
            recipient,
            amount: MINING_REWARD,
        }
    }
}
