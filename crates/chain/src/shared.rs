//! Shared, lock-guarded access to a [`Ledger`] for concurrent hosts.
//!
//! Every mutation goes through one `RwLock`. Mining solves the puzzle on the
//! blocking pool with no lock held and only takes the write lock for the
//! final commit, so reads and registrations are never stalled by a search.

use crate::ledger::{Ledger, LedgerError, LedgerStats};
use hashledger_consensus::ProofOfWork;
use hashledger_core::{Block, ChainSnapshot, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Errors that can occur while mining through a [`SharedLedger`].
#[derive(Debug, Error)]
pub enum MineError {
    #[error("mining was cancelled")]
    Cancelled,

    #[error("mining task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Cancellation switch for in-flight proof searches.
#[derive(Debug, Clone, Default)]
pub struct MiningControl {
    cancelled: Arc<AtomicBool>,
}

impl MiningControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every search using this control to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Cloneable handle to a ledger shared between request handlers.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Queue a record; returns the block index it is expected to land in.
    pub async fn append_transaction(&self, tx: Transaction) -> u64 {
        self.inner.write().await.append_transaction(tx)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn last_block(&self) -> Block {
        self.inner.read().await.last_block().clone()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.inner.read().await.pending().to_vec()
    }

    pub async fn snapshot(&self) -> ChainSnapshot {
        self.inner.read().await.snapshot()
    }

    pub async fn stats(&self) -> LedgerStats {
        self.inner.read().await.stats()
    }

    /// Swap in a whole new chain atomically.
    pub async fn replace_chain(&self, chain: Vec<Block>) -> Result<(), LedgerError> {
        self.inner.write().await.replace_chain(chain)
    }

    /// Swap in `chain` only if it is strictly longer than the current one,
    /// checked and applied under a single write lock.
    pub async fn replace_if_longer(&self, chain: Vec<Block>) -> bool {
        let mut ledger = self.inner.write().await;
        let (old_len, new_len) = (ledger.len(), chain.len());
        if new_len <= old_len {
            debug!(old_len, new_len, "candidate chain no longer longer than ours");
            return false;
        }
        let replaced = ledger.replace_chain(chain).is_ok();
        if replaced {
            info!(old_len, new_len, "replaced local chain");
        }
        replaced
    }

    /// Mine the next block.
    ///
    /// The proof is searched against a snapshot of the last block. If another
    /// block was committed or the chain was replaced in the meantime, the
    /// search restarts on the new tip. Records submitted during the search
    /// land in the block being committed.
    pub async fn mine(&self, control: &MiningControl) -> Result<Block, MineError> {
        self.mine_inner(control, None).await
    }

    /// Mine the next block, sealing `stamp` after the pending records.
    ///
    /// The stamp only enters the ledger with the committed block; a cancelled
    /// search leaves the pool exactly as it was.
    pub async fn mine_stamped(
        &self,
        control: &MiningControl,
        stamp: Transaction,
    ) -> Result<Block, MineError> {
        self.mine_inner(control, Some(stamp)).await
    }

    async fn mine_inner(
        &self,
        control: &MiningControl,
        stamp: Option<Transaction>,
    ) -> Result<Block, MineError> {
        loop {
            let parent = self.last_block().await;
            let parent_hash = parent.hash_hex();

            let cancelled = control.cancelled.clone();
            let proof =
                tokio::task::spawn_blocking(move || ProofOfWork::solve_until(&parent, &cancelled))
                    .await?
                    .ok_or(MineError::Cancelled)?;
            debug!(proof, parent = %parent_hash, "found proof");

            let committed = self
                .inner
                .write()
                .await
                .commit_block(proof, &parent_hash, stamp.clone());
            match committed {
                Ok(block) => {
                    info!(
                        index = block.index,
                        proof = block.proof,
                        transactions = block.tx_count(),
                        "mined block"
                    );
                    return Ok(block);
                }
                Err(err) => debug!(%err, "retrying proof search on new tip"),
            }
        }
    }
}
