//! Block structure and the chain wire snapshot.

use crate::hash::{hash_canonical, Hash};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch; a clock set before the epoch reads as 0.
fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// Sentinel `previous_hash` of a genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Fixed proof of a genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// A sealed block of transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    /// Unix timestamp in seconds, with sub-second precision.
    pub timestamp: f64,
    /// Records sealed into this block, in submission order.
    pub transactions: Vec<Transaction>,
    /// Proof-of-work solution for this block.
    pub proof: u64,
    /// Hex digest of the preceding block, or `"1"` for genesis.
    pub previous_hash: String,
}

impl Block {
    /// Create a new block stamped with the current time.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp: Self::current_timestamp(),
            transactions,
            proof,
            previous_hash: previous_hash.into(),
        }
    }

    /// Create the genesis block.
    pub fn genesis() -> Self {
        Self::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH)
    }

    /// Get the current Unix timestamp in seconds.
    pub fn current_timestamp() -> f64 {
        unix_seconds(SystemTime::now())
    }

    /// SHA-256 of the block's canonical JSON encoding.
    pub fn hash(&self) -> Hash {
        hash_canonical(self).expect("serialization should not fail")
    }

    /// The block hash as 64 lowercase hex characters.
    pub fn hash_hex(&self) -> String {
        self.hash().to_hex()
    }

    /// Check if this is a genesis block.
    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

/// A full copy of a chain as served to peers: `{ "chain": [...], "length": n }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainSnapshot {
    /// Wrap a chain, deriving `length` from it.
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }

    /// Whether the advertised length matches the blocks actually sent.
    pub fn is_consistent(&self) -> bool {
        self.length == self.chain.len()
    }
}
