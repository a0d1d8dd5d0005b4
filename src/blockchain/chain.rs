use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::block::Block;
use super::crypto::Address;
use super::proof::proof_of_work;
use super::transaction::{Transaction, TransactionError};
use super::validation::is_valid_chain;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Chain has no blocks")]
    EmptyChain,

    #[error("Mining was cancelled")]
    MiningCancelled,

    #[error("System error: {0}")]
    SystemError(String),
}

/// Blocks and pending transactions, always locked together
#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    pending_transactions: Vec<Transaction>,
}

/// Represents the blockchain
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks and the pool waiting to be mined
    state: Arc<RwLock<LedgerState>>,

    /// Address credited with the reward for blocks mined here
    node_identifier: Address,
}

impl Blockchain {
    /// Creates a new blockchain holding only the genesis block
    ///
    /// # Arguments
    ///
    /// * `node_identifier` - The address that receives mining rewards
    pub fn new(node_identifier: Address) -> Self {
        Blockchain {
            state: Arc::new(RwLock::new(LedgerState {
                chain: vec![Block::genesis()],
                pending_transactions: Vec::new(),
            })),
            node_identifier,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets the last block in the chain
    pub fn get_last_block(&self) -> Result<Block, BlockchainError> {
        self.read().chain.last().cloned().ok_or(BlockchainError::EmptyChain)
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// # Returns
    ///
    /// The index of the block expected to include this transaction. This is
    /// advisory: other submissions or a chain replacement may land first.
    pub fn add_transaction(
        &self,
        sender: Address,
        recipient: Address,
        amount: u64,
    ) -> Result<u64, BlockchainError> {
        let transaction = Transaction::new(sender, recipient, amount)?;

        let mut state = self.write();
        let next_index = state
            .chain
            .last()
            .map(|block| block.index + 1)
            .ok_or(BlockchainError::EmptyChain)?;
        state.pending_transactions.push(transaction);

        Ok(next_index)
    }

    /// Mines a new block with the pending transactions
    pub async fn mine_block(&self) -> Result<Block, BlockchainError> {
        self.mine_block_cancellable(&CancellationToken::new()).await
    }

    /// Mines a new block, giving up when `cancel` fires
    ///
    /// The proof search runs on the blocking pool without holding the ledger
    /// lock. If the tip moves while searching, the search restarts from the
    /// new tip.
    pub async fn mine_block_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Block, BlockchainError> {
        loop {
            let last_block = self.get_last_block()?;
            let last_proof = last_block.proof;
            let token = cancel.clone();

            let proof = tokio::task::spawn_blocking(move || proof_of_work(last_proof, &token))
                .await
                .map_err(|e| BlockchainError::SystemError(e.to_string()))?
                .ok_or(BlockchainError::MiningCancelled)?;

            if let Some(block) = self.append_mined_block(&last_block, proof) {
                return Ok(block);
            }

            info!(
                "Chain tip moved while mining on block {}, restarting search",
                last_block.index
            );
        }
    }

    /// Forges and appends a block if `last_block` is still the tip
    fn append_mined_block(&self, last_block: &Block, proof: u64) -> Option<Block> {
        let previous_hash = last_block.calculate_hash();

        let mut state = self.write();
        if state.chain.last() != Some(last_block) {
            return None;
        }

        // The reward goes into the same block it pays for
        let reward = Transaction::new_reward(self.node_identifier.clone());
        state.pending_transactions.push(reward);
        let transactions = std::mem::take(&mut state.pending_transactions);

        let block = Block::new(state.chain.len() as u64 + 1, transactions, proof, previous_hash);
        state.chain.push(block.clone());

        info!(
            "Forged block {} with {} transactions (proof {})",
            block.index,
            block.transactions.len(),
            block.proof
        );

        Some(block)
    }

    /// Computes the confirmed balance of an address
    ///
    /// Only mined blocks count; pending transactions are ignored.
    pub fn get_balance(&self, address: &Address) -> i64 {
        let state = self.read();
        let mut balance: i64 = 0;

        for transaction in state.chain.iter().flat_map(|block| &block.transactions) {
            let amount = i64::try_from(transaction.amount).unwrap_or(i64::MAX);

            if transaction.recipient == *address {
                balance = balance.saturating_add(amount);
            }

            if transaction.sender == *address {
                balance = balance.saturating_sub(amount);
            }
        }

        balance
    }

    /// Gets the entire blockchain
    pub fn get_chain(&self) -> Vec<Block> {
        self.read().chain.clone()
    }

    /// Gets the number of blocks in the chain
    pub fn chain_length(&self) -> usize {
        self.read().chain.len()
    }

    /// Gets all pending transactions
    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.read().pending_transactions.clone()
    }

    /// Validates the local chain
    pub fn is_valid(&self) -> bool {
        is_valid_chain(&self.read().chain)
    }

    /// Swaps in `candidate` if it is longer than the current chain
    ///
    /// The length is compared under the write lock, against the chain as it
    /// is at swap time. Callers validate the candidate beforehand. The pending
    /// pool is left untouched.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> bool {
        let mut state = self.write();

        if candidate.len() <= state.chain.len() {
            return false;
        }

        info!(
            "Replacing chain of length {} with chain of length {}",
            state.chain.len(),
            candidate.len()
        );
        state.chain = candidate;

        true
    }
}
