//! Proof-of-work consensus rules for hashledger.
//!
//! This crate provides:
//! - The proof-of-work puzzle and its brute-force solver
//! - Full-chain validation (hash links and proofs)
//!
//! # Example
//!
//! ```rust,no_run
//! use hashledger_consensus::{ChainValidator, ProofOfWork};
//! use hashledger_core::Block;
//!
//! let genesis = Block::genesis();
//! let proof = ProofOfWork::solve(&genesis);
//! let block = Block::new(2, vec![], proof, genesis.hash_hex());
//!
//! assert!(ChainValidator::is_valid(&[genesis, block]));
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{valid_proof, ProofOfWork, DIFFICULTY_PREFIX};
pub use validator::{ChainValidator, ValidationError};
