//! Full-chain validation.
//!
//! A chain is valid when every block links to the hash of its predecessor
//! and carries a proof that solves the puzzle posed by that predecessor.
//! The genesis block is taken as the trusted root and is not inspected.

use crate::pow::valid_proof;
use hashledger_core::Block;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chain is empty")]
    EmptyChain,

    #[error("block {index} previous_hash does not match its parent")]
    PreviousHashMismatch { index: u64 },

    #[error("block {index} carries an invalid proof of work")]
    InvalidProof { index: u64 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Chain validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Validate a whole chain, stopping at the first broken link.
    pub fn validate(chain: &[Block]) -> Result<()> {
        if chain.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        for pair in chain.windows(2) {
            let (prev, block) = (&pair[0], &pair[1]);
            let prev_hash = prev.hash_hex();

            if block.previous_hash != prev_hash {
                return Err(ValidationError::PreviousHashMismatch { index: block.index });
            }

            if !valid_proof(prev.proof, block.proof, &prev_hash) {
                return Err(ValidationError::InvalidProof { index: block.index });
            }
        }

        Ok(())
    }

    /// Whether the chain passes [`ChainValidator::validate`].
    pub fn is_valid(chain: &[Block]) -> bool {
        Self::validate(chain).is_ok()
    }
}
