use log::debug;

use super::block::Block;
use super::proof::valid_proof;

/// Checks the hash links and proof pairings of a candidate chain
///
/// Each block must point at the hash of its predecessor, and its proof must
/// solve the puzzle posed by the predecessor's proof. The first block is taken
/// as given. An empty chain is invalid.
pub fn is_valid_chain(chain: &[Block]) -> bool {
    if chain.is_empty() {
        return false;
    }

    for pair in chain.windows(2) {
        let (last_block, block) = (&pair[0], &pair[1]);

        if block.previous_hash != last_block.calculate_hash() {
            debug!("Block {} does not link to its predecessor", block.index);
            return false;
        }

        if !valid_proof(last_block.proof, block.proof) {
            debug!("Block {} carries an invalid proof", block.index);
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::proof::proof_of_work;
    use crate::blockchain::{Address, Transaction};
    use tokio_util::sync::CancellationToken;

    fn build_chain(blocks: usize) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];

        while chain.len() < blocks {
            let last = chain.last().unwrap();
            let proof = proof_of_work(last.proof, &CancellationToken::new()).unwrap();
            let transactions = vec![
                Transaction::new(Address("alice".to_string()), Address("bob".to_string()), 2).unwrap(),
                Transaction::new_reward(Address("miner".to_string())),
            ];
            let block = Block::new(last.index + 1, transactions, proof, last.calculate_hash());
            chain.push(block);
        }

        chain
    }

    #[test]
    fn test_minted_chain_is_valid() {
        assert!(is_valid_chain(&build_chain(3)));
    }

    #[test]
    fn test_single_block_chain_is_valid() {
        assert!(is_valid_chain(&[Block::genesis()]));

        // Genesis is never checked against a template
        let mut odd = Block::genesis();
        odd.proof = 7;
        odd.previous_hash = "anything".to_string();
        assert!(is_valid_chain(&[odd]));
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        assert!(!is_valid_chain(&[]));
    }

    #[test]
    fn test_tampered_amount_is_detected() {
        let chain = build_chain(4);

        // The tip has no successor, so only blocks that are linked to are covered
        for position in 1..chain.len() - 1 {
            let mut tampered = chain.clone();
            tampered[position].transactions[0].amount = 1_000;
            assert!(!is_valid_chain(&tampered), "tampering block {} went unnoticed", position + 1);
        }
    }

    #[test]
    fn test_broken_link_is_detected() {
        let mut chain = build_chain(2);
        chain[1].previous_hash = "0".repeat(64);

        assert!(!is_valid_chain(&chain));
    }

    #[test]
    fn test_bad_proof_is_detected() {
        let mut chain = build_chain(2);
        chain[1].proof += 1;

        assert!(!is_valid_chain(&chain));
    }
}
