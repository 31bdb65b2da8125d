//! Core ledger primitives for hashledger.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - SHA-256 hashing over a canonical JSON encoding
//! - Opaque transaction records
//! - Blocks and the chain snapshot exchanged between peers

pub mod block;
pub mod hash;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{Block, ChainSnapshot, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use hash::{canonical_json, hash_canonical, sha256, sha256_hex, Hash, H256};
pub use transaction::{FieldValue, Transaction};
