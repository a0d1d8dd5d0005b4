use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::blockchain::consensus::parse_location;
use crate::blockchain::{Address, Block, Blockchain, BlockchainError, Consensus, IdentityService};

/// Errors returned by node operations
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: i64 },

    #[error("Blockchain error: {0}")]
    BlockchainError(#[from] BlockchainError),
}

/// A ledger node: the blockchain, its peers and the identity service
#[derive(Clone)]
pub struct Node {
    blockchain: Blockchain,
    consensus: Arc<Consensus>,
    identity: Arc<dyn IdentityService>,
    resolve_before_balance: bool,
}

impl Node {
    pub fn new(
        blockchain: Blockchain,
        consensus: Consensus,
        identity: Arc<dyn IdentityService>,
        resolve_before_balance: bool,
    ) -> Self {
        Node {
            blockchain,
            consensus: Arc::new(consensus),
            identity,
            resolve_before_balance,
        }
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn consensus(&self) -> &Consensus {
        &self.consensus
    }

    pub fn identity(&self) -> &dyn IdentityService {
        self.identity.as_ref()
    }

    /// Admits a transfer into the pending pool
    ///
    /// Every check runs before the pool is touched. The funds check only
    /// sees mined blocks, so several pending transfers from one sender can
    /// together exceed its balance.
    ///
    /// # Returns
    ///
    /// The index of the block the transaction is expected to land in
    pub async fn submit_transaction(
        &self,
        sender: &str,
        private_key: &str,
        recipient: &str,
        amount: i64,
    ) -> Result<u64, NodeError> {
        let amount = u64::try_from(amount)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| NodeError::MalformedRequest("Amount must be a positive integer".to_string()))?;

        if !self.identity.is_well_formed_address(sender)
            || !self.identity.is_well_formed_address(recipient)
        {
            return Err(NodeError::Unauthorized("Addresses are not valid".to_string()));
        }

        if !self.identity.check_key_ownership(sender, private_key) {
            return Err(NodeError::Unauthorized(
                "Private key does not match sender address".to_string(),
            ));
        }

        let available = self.balance(sender).await;
        if available < 0 || (available as u64) < amount {
            return Err(NodeError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        let index = self
            .blockchain
            .add_transaction(Address::from(sender), Address::from(recipient), amount)?;

        info!("Queued transfer of {} from {} to {} for block {}", amount, sender, recipient, index);
        Ok(index)
    }

    /// Computes the confirmed balance of `address`
    ///
    /// When configured to, the node first adopts the longest valid chain
    /// among its peers.
    pub async fn balance(&self, address: &str) -> i64 {
        if self.resolve_before_balance {
            self.consensus.resolve_conflicts(&self.blockchain).await;
        }

        self.blockchain.get_balance(&Address::from(address))
    }

    /// Mines the pending pool into a new block
    pub async fn mine(&self) -> Result<Block, NodeError> {
        Ok(self.blockchain.mine_block().await?)
    }

    /// Registers peers; nothing is stored unless every address parses
    ///
    /// # Returns
    ///
    /// All registered peers
    pub fn register_nodes(&self, nodes: &[String]) -> Result<Vec<String>, NodeError> {
        for node in nodes {
            parse_location(node).map_err(|e| NodeError::MalformedRequest(e.to_string()))?;
        }

        for node in nodes {
            match self.consensus.register_node(node) {
                Ok(location) => info!("Registered peer {}", location),
                Err(err) => warn!("Failed to register peer {}: {}", node, err),
            }
        }

        Ok(self.consensus.nodes())
    }

    /// Runs conflict resolution against all peers
    ///
    /// # Returns
    ///
    /// true if the local chain was replaced
    pub async fn resolve(&self) -> bool {
        self.consensus.resolve_conflicts(&self.blockchain).await
    }
}
