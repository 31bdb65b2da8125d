//! The ledger: an append-only chain of blocks plus the pool of records
//! waiting for the next block.

use hashledger_consensus::ProofOfWork;
use hashledger_core::{Block, ChainSnapshot, Transaction};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("chain must contain at least the genesis block")]
    EmptyChain,

    #[error("parent block changed while mining (expected {expected}, found {found})")]
    StaleParent { expected: String, found: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStats {
    /// Number of blocks, genesis included.
    pub length: usize,
    /// Hash of the latest block.
    pub last_block_hash: String,
    /// Timestamp of the latest block.
    pub last_timestamp: f64,
    /// Number of records waiting to be mined.
    pub pending_transactions: usize,
}

/// The chain and its pending-record pool.
///
/// Invariant: `chain` is never empty and `chain[0]` is the root the rest of
/// the chain links back to.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Ledger {
    /// Create a ledger holding only a fresh genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
        }
    }

    /// Create a ledger from an existing chain. The chain is not validated.
    pub fn from_chain(chain: Vec<Block>) -> Result<Self> {
        if chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        Ok(Self {
            chain,
            pending: Vec::new(),
        })
    }

    /// All blocks, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Records waiting for the next block, in submission order.
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Number of blocks in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false; a ledger holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// The most recently appended block.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger chain always holds a genesis block")
    }

    /// Queue a record for the next block.
    ///
    /// Returns the index of the block the record is expected to land in.
    /// This is advisory: more records may arrive before the next mine.
    pub fn append_transaction(&mut self, tx: Transaction) -> u64 {
        self.pending.push(tx);
        self.last_block().index + 1
    }

    /// Solve the puzzle for the next block and append it, consuming the pool.
    ///
    /// Blocks the caller for the whole search. Concurrent hosts should go
    /// through [`crate::SharedLedger::mine`] instead.
    pub fn mine(&mut self) -> Block {
        let last = self.last_block();
        let proof = ProofOfWork::solve(last);
        let previous_hash = last.hash_hex();
        self.push_block(proof, previous_hash, None)
    }

    /// Append a block sealed with `proof` on top of the block hashing to
    /// `parent_hash`, draining the pending pool into it. A `stamp` record, if
    /// given, is sealed after the pending records.
    ///
    /// Fails with [`LedgerError::StaleParent`] if the chain moved on since
    /// the proof was computed; the pool and the stamp are then left out.
    pub fn commit_block(
        &mut self,
        proof: u64,
        parent_hash: &str,
        stamp: Option<Transaction>,
    ) -> Result<Block> {
        let found = self.last_block().hash_hex();
        if found != parent_hash {
            return Err(LedgerError::StaleParent {
                expected: parent_hash.to_string(),
                found,
            });
        }
        Ok(self.push_block(proof, found, stamp))
    }

    fn push_block(
        &mut self,
        proof: u64,
        previous_hash: String,
        stamp: Option<Transaction>,
    ) -> Block {
        let mut transactions = std::mem::take(&mut self.pending);
        transactions.extend(stamp);
        let block = Block::new(self.chain.len() as u64 + 1, transactions, proof, previous_hash);
        self.chain.push(block.clone());
        block
    }

    /// Swap in a whole new chain. The pending pool is left untouched.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<()> {
        if chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        self.chain = chain;
        Ok(())
    }

    /// A copy of the chain in its wire form.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::new(self.chain.clone())
    }

    /// Get ledger statistics.
    pub fn stats(&self) -> LedgerStats {
        let last = self.last_block();
        LedgerStats {
            length: self.chain.len(),
            last_block_hash: last.hash_hex(),
            last_timestamp: last.timestamp,
            pending_transactions: self.pending.len(),
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
