use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Previous-hash marker stored in the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Block {
    /// Position of the block in the chain, starting at 1
    pub index: u64,

    /// Seconds since the Unix epoch when the block was created
    pub timestamp: f64,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub proof: u64,

    /// Hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The list of transactions to include in the block
    /// * `proof` - The proof of work
    /// * `previous_hash` - The hash of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: now_seconds(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Creates the first block of every chain
    pub fn genesis() -> Self {
        Block::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Calculates the hash of the block
    ///
    /// The block is rendered as compact JSON with object keys sorted at every
    /// level, so peers agree on the digest regardless of field order.
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a lowercase hexadecimal string
    pub fn calculate_hash(&self) -> String {
        let block_data = serde_json::json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
        });

        let block_string = canonical(block_data).to_string();

        let mut hasher = Sha256::new();
        hasher.update(block_string.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Rebuilds every object with its keys inserted in sorted order
fn canonical(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonical(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Address;

    fn sample_block() -> Block {
        let transactions = vec![
            Transaction::new(Address("alice".to_string()), Address("bob".to_string()), 3).unwrap(),
            Transaction::new_reward(Address("miner".to_string())),
        ];

        Block {
            index: 2,
            timestamp: 1_700_000_000.25,
            transactions,
            proof: 35293,
            previous_hash: "abc".to_string(),
        }
    }

    #[test]
    fn test_genesis_block() {
        let block = Block::genesis();

        assert_eq!(block.index, 1);
        assert_eq!(block.proof, 100);
        assert_eq!(block.previous_hash, "1");
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn test_calculate_hash() {
        let block = sample_block();

        let hash = block.calculate_hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, block.calculate_hash());
    }

    #[test]
    fn test_hash_ignores_field_order() {
        let block = sample_block();

        let reordered = r#"{
            "transactions": [
                {"amount": 3, "recipient": "bob", "sender": "alice"},
                {"recipient": "miner", "amount": 1, "sender": "0"}
            ],
            "previous_hash": "abc",
            "proof": 35293,
            "timestamp": 1700000000.25,
            "index": 2
        }"#;
        let decoded: Block = serde_json::from_str(reordered).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.calculate_hash(), block.calculate_hash());
    }

    #[test]
    fn test_hash_changes_with_any_field() {
        let block = sample_block();
        let original = block.calculate_hash();

        let mut changed = block.clone();
        changed.index += 1;
        assert_ne!(changed.calculate_hash(), original);

        let mut changed = block.clone();
        changed.timestamp += 0.5;
        assert_ne!(changed.calculate_hash(), original);

        let mut changed = block.clone();
        changed.proof += 1;
        assert_ne!(changed.calculate_hash(), original);

        let mut changed = block.clone();
        changed.previous_hash = "abd".to_string();
        assert_ne!(changed.calculate_hash(), original);

        let mut changed = block.clone();
        changed.transactions[0].amount = 4;
        assert_ne!(changed.calculate_hash(), original);

        let mut changed = block;
        changed.transactions[1].recipient = Address("thief".to_string());
        assert_ne!(changed.calculate_hash(), original);
    }

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let value = serde_json::json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]});
        assert_eq!(
            canonical(value).to_string(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }
}
