//! Ledger orchestration for hashledger.
//!
//! This crate brings the core types and consensus rules together:
//! - **Ledger**: the chain plus the pool of records awaiting the next block
//! - **SharedLedger**: lock-guarded handle for concurrent hosts, with
//!   cancellable mining that holds the lock only to commit
//! - **PeerRegistry**: the set of known peer network locations
//! - **ConsensusResolver**: longest-valid-chain reconciliation across peers
//!
//! # Example
//!
//! ```rust,no_run
//! use hashledger_chain::{MiningControl, SharedLedger};
//! use hashledger_core::Transaction;
//!
//! # async fn demo() {
//! let ledger = SharedLedger::default();
//! ledger.append_transaction(Transaction::new().with("note", "hello")).await;
//! let block = ledger.mine(&MiningControl::new()).await.unwrap();
//! assert_eq!(block.index, 2);
//! # }
//! ```

pub mod ledger;
pub mod peers;
pub mod resolver;
pub mod shared;

// Re-export commonly used types
pub use ledger::{Ledger, LedgerError, LedgerStats};
pub use peers::{normalize_address, PeerError, PeerRegistry, RegistrationReport};
pub use resolver::{select_longest, ChainFetcher, ConsensusResolver, FetchError};
pub use shared::{MineError, MiningControl, SharedLedger};
