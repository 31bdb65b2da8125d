//! Proof-of-work puzzle.
//!
//! A block's proof `p'` is valid against its parent when
//! `sha256("{parent.proof}{p'}{hash(parent)}")` starts with four hex zeros.
//! Difficulty is fixed; there is no retargeting.

use hashledger_core::{sha256_hex, Block};
use std::sync::atomic::{AtomicBool, Ordering};

/// Required hex prefix of a winning digest.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// How many candidates are tried between cancellation checks.
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Check a candidate proof against the previous proof and block hash.
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &str) -> bool {
    let guess = format!("{}{}{}", last_proof, proof, last_hash);
    sha256_hex(guess.as_bytes()).starts_with(DIFFICULTY_PREFIX)
}

/// Brute-force proof search.
pub struct ProofOfWork;

impl ProofOfWork {
    /// Find the smallest proof that seals a block on top of `last_block`.
    ///
    /// Runs until a solution is found. Every node solving against the same
    /// parent arrives at the same proof.
    pub fn solve(last_block: &Block) -> u64 {
        let last_hash = last_block.hash_hex();
        let mut proof = 0;
        while !valid_proof(last_block.proof, proof, &last_hash) {
            proof += 1;
        }
        proof
    }

    /// Like [`ProofOfWork::solve`], but gives up once `cancel` is set.
    pub fn solve_until(last_block: &Block, cancel: &AtomicBool) -> Option<u64> {
        let last_hash = last_block.hash_hex();
        let mut proof = 0u64;
        loop {
            if proof % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return None;
            }
            if valid_proof(last_block.proof, proof, &last_hash) {
                return Some(proof);
            }
            proof = proof.checked_add(1)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashledger_core::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};

    // hash of this block is 7dd0b05c...98f2; its minimal proof is 3336
    fn fixed_genesis() -> Block {
        Block {
            index: 1,
            timestamp: 1700000000.5,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    const GENESIS_HASH: &str = "7dd0b05c7a6aafba30a3d6c7102d235385a934972e4c066bcea9f6adcbae98f2";

    #[test]
    fn test_valid_proof_known_true() {
        // sha256("1003336" + hash) = 0000d005...
        assert!(valid_proof(100, 3336, GENESIS_HASH));
    }

    #[test]
    fn test_valid_proof_known_false() {
        // sha256("1000" + hash) = 0bd31c53...
        assert!(!valid_proof(100, 0, GENESIS_HASH));
        assert!(!valid_proof(100, 3335, GENESIS_HASH));
    }

    #[test]
    fn test_solve_known_answer() {
        let genesis = fixed_genesis();
        assert_eq!(genesis.hash_hex(), GENESIS_HASH);
        assert_eq!(ProofOfWork::solve(&genesis), 3336);
    }

    #[test]
    fn test_solve_is_minimal() {
        let genesis = fixed_genesis();
        let proof = ProofOfWork::solve(&genesis);
        let last_hash = genesis.hash_hex();

        assert!(valid_proof(genesis.proof, proof, &last_hash));
        assert!((0..proof).all(|p| !valid_proof(genesis.proof, p, &last_hash)));
    }

    #[test]
    fn test_solve_deterministic() {
        let genesis = fixed_genesis();
        assert_eq!(ProofOfWork::solve(&genesis), ProofOfWork::solve(&genesis));
    }

    #[test]
    fn test_solve_until_matches_solve() {
        let genesis = fixed_genesis();
        let cancel = AtomicBool::new(false);
        assert_eq!(ProofOfWork::solve_until(&genesis, &cancel), Some(3336));
    }

    #[test]
    fn test_solve_until_cancelled() {
        let genesis = fixed_genesis();
        let cancel = AtomicBool::new(true);
        assert_eq!(ProofOfWork::solve_until(&genesis, &cancel), None);
    }
}
