use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

/// Hex prefix a proof hash must start with
const TARGET_PREFIX: &str = "0000";

/// Number of candidates tried between cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Checks whether `proof` solves the puzzle posed by `last_proof`
///
/// The puzzle is solved when the SHA-256 of the two numbers written out in
/// decimal, back to back, starts with four zero hex digits.
pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    let guess = format!("{}{}", last_proof, proof);

    let mut hasher = Sha256::new();
    hasher.update(guess.as_bytes());
    hex::encode(hasher.finalize()).starts_with(TARGET_PREFIX)
}

/// Finds the smallest proof that solves the puzzle for `last_proof`
///
/// Returns `None` if `cancel` fires before a solution is found.
pub fn proof_of_work(last_proof: u64, cancel: &CancellationToken) -> Option<u64> {
    let mut proof = 0;

    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return None;
        }

        if valid_proof(last_proof, proof) {
            return Some(proof);
        }

        proof += 1;
    }
}
