//! HTTP API for a ledger node.
//!
//! Handlers are thin: they hand opaque records to the ledger, trigger
//! mining and conflict resolution, and expose the chain to peers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hashledger_chain::{
    ChainFetcher, ConsensusResolver, MineError, MiningControl, PeerRegistry, RegistrationReport,
    SharedLedger,
};
use hashledger_core::{Block, ChainSnapshot, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Errors returned to API clients as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("mining was cancelled")]
    MiningCancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MiningCancelled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<MineError> for ApiError {
    fn from(err: MineError) -> Self {
        match err {
            MineError::Cancelled => ApiError::MiningCancelled,
            MineError::Task(err) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Node state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub node_id: String,
    pub ledger: SharedLedger,
    pub peers: Arc<RwLock<PeerRegistry>>,
    resolver: Arc<ConsensusResolver<dyn ChainFetcher>>,
    mining: Arc<Mutex<MiningControl>>,
}

impl AppState {
    pub fn new(
        node_id: impl Into<String>,
        fetcher: Arc<dyn ChainFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            ledger: SharedLedger::default(),
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            resolver: Arc::new(ConsensusResolver::from_arc(fetcher, fetch_timeout)),
            mining: Arc::new(Mutex::new(MiningControl::new())),
        }
    }

    /// Register peers, logging any that are rejected.
    pub async fn register_peers<S: AsRef<str>>(&self, addresses: &[S]) -> RegistrationReport {
        let report = self.peers.write().await.register_all(addresses);
        for (address, err) in &report.rejected {
            warn!(address = %address, %err, "rejected peer address");
        }
        if !report.registered.is_empty() {
            info!(peers = ?report.registered, "registered peers");
        }
        report
    }

    /// Abort every proof search currently in flight. Later mines are
    /// unaffected.
    pub async fn cancel_mining(&self) {
        let mut control = self.mining.lock().await;
        std::mem::take(&mut *control).cancel();
    }

    async fn mining_control(&self) -> MiningControl {
        self.mining.lock().await.clone()
    }
}

/// Record sealed last into each mined block, identifying the node that mined it.
fn miner_stamp(node_id: &str) -> Transaction {
    Transaction::new()
        .with("miner", node_id)
        .with("reward", 1i64)
}

#[derive(Debug, Serialize)]
struct MineResponse {
    message: &'static str,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        Self {
            message: "New Block Forged",
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    nodes: Option<Vec<String>>,
}

async fn mine(State(state): State<AppState>) -> Result<Json<MineResponse>, ApiError> {
    let control = state.mining_control().await;
    let block = state
        .ledger
        .mine_stamped(&control, miner_stamp(&state.node_id))
        .await?;
    Ok(Json(block.into()))
}

async fn cancel_mining(State(state): State<AppState>) -> impl IntoResponse {
    state.cancel_mining().await;
    info!("cancelled in-flight mining");
    Json(json!({ "message": "Mining cancelled" }))
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Result<impl IntoResponse, ApiError> {
    if tx.is_empty() {
        return Err(ApiError::BadRequest("Missing values".into()));
    }
    let index = state.ledger.append_transaction(tx).await;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Transaction will be added to Block {}", index),
            "index": index,
        })),
    ))
}

async fn pending_transactions(State(state): State<AppState>) -> impl IntoResponse {
    let pending = state.ledger.pending().await;
    Json(json!({ "count": pending.len(), "transactions": pending }))
}

async fn full_chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.ledger.snapshot().await)
}

async fn register_nodes(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let nodes = match request.nodes {
        Some(nodes) if !nodes.is_empty() => nodes,
        _ => {
            return Err(ApiError::BadRequest(
                "Please supply a valid list of nodes".into(),
            ))
        }
    };

    let report = state.register_peers(&nodes).await;
    let rejected: Vec<_> = report
        .rejected
        .iter()
        .map(|(address, err)| json!({ "address": address, "error": err.to_string() }))
        .collect();
    let total_nodes = state.peers.read().await.peers();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "New nodes have been added",
            "total_nodes": total_nodes,
            "rejected": rejected,
        })),
    ))
}

async fn list_nodes(State(state): State<AppState>) -> impl IntoResponse {
    let nodes = state.peers.read().await.peers();
    Json(json!({ "count": nodes.len(), "nodes": nodes }))
}

async fn resolve_conflicts(State(state): State<AppState>) -> impl IntoResponse {
    let peers = state.peers.read().await.peers();
    let replaced = state.resolver.resolve(&state.ledger, &peers).await;
    let chain = state.ledger.snapshot().await.chain;

    if replaced {
        Json(json!({ "message": "Our chain was replaced", "new_chain": chain }))
    } else {
        Json(json!({ "message": "Our chain is authoritative", "chain": chain }))
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.ledger.stats().await;
    Json(json!({
        "status": "ok",
        "node_id": state.node_id,
        "length": stats.length,
        "last_block_hash": stats.last_block_hash,
        "last_timestamp": stats.last_timestamp,
        "pending_transactions": stats.pending_transactions,
        "peers": state.peers.read().await.len(),
    }))
}

/// Build the node's HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mine", get(mine))
        .route("/mine/cancel", post(cancel_mining))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route("/chain", get(full_chain))
        .route("/nodes", get(list_nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_conflicts))
        .route("/health", get(health))
        .with_state(state)
}
