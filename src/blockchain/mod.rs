// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure and hashing
// - Proof of work
// - Ledger (chain, pending pool, balances)
// - Chain validation
// - Consensus against peers
// - Identity service

pub mod block;
pub mod chain;
pub mod consensus;
pub mod crypto;
pub mod peer;
pub mod proof;
pub mod transaction;
pub mod validation;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Blockchain, BlockchainError};
pub use consensus::Consensus;
pub use crypto::{Address, Ed25519Identity, IdentityService, KeyPair};
pub use peer::{ChainSnapshot, HttpPeerFetcher};
pub use transaction::Transaction;
