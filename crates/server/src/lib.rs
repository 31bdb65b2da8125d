//! HTTP node for hashledger.
//!
//! Wires the ledger, peer registry and conflict resolver into an axum
//! service, with a reqwest-based fetcher for pulling peer chains.

pub mod api;
pub mod config;
pub mod fetcher;

pub use api::{build_router, ApiError, AppState};
pub use config::{ConfigError, NodeArgs, NodeConfig};
pub use fetcher::HttpChainFetcher;
