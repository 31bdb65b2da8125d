//! Longest-valid-chain conflict resolution across peers.
//!
//! Every peer is queried concurrently, each under its own timeout. Results
//! are then scanned in peer order: a peer chain becomes the candidate if it
//! is strictly longer than the best seen so far and passes full validation.
//! Unreachable peers and invalid chains are skipped, never fatal.

use crate::shared::SharedLedger;
use async_trait::async_trait;
use hashledger_consensus::ChainValidator;
use hashledger_core::{Block, ChainSnapshot};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Why a peer's chain could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    #[error("peer timed out")]
    Timeout,

    #[error("peer answered with status {0}")]
    Status(u16),

    #[error("peer sent an undecodable chain: {0}")]
    Decode(String),
}

/// Source of peer chains, typically an HTTP client.
#[async_trait]
pub trait ChainFetcher: Send + Sync + 'static {
    /// Fetch the full chain held by `peer`.
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, FetchError>;
}

/// Resolves conflicts by adopting the longest valid chain among peers.
pub struct ConsensusResolver<F: ?Sized> {
    fetcher: Arc<F>,
    timeout: Duration,
}

impl<F: ChainFetcher> ConsensusResolver<F> {
    /// Create a resolver whose per-peer fetches give up after `timeout`.
    pub fn new(fetcher: F, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(fetcher), timeout)
    }
}

impl<F: ChainFetcher + ?Sized> ConsensusResolver<F> {
    /// Create a resolver around a shared (possibly type-erased) fetcher.
    pub fn from_arc(fetcher: Arc<F>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Query all peers concurrently. Results are returned in `peers` order.
    pub async fn fetch_all(&self, peers: &[String]) -> Vec<Result<ChainSnapshot, FetchError>> {
        let mut tasks = JoinSet::new();
        for (slot, peer) in peers.iter().cloned().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = tokio::time::timeout(timeout, fetcher.fetch_chain(&peer))
                    .await
                    .unwrap_or(Err(FetchError::Timeout));
                (slot, result)
            });
        }

        let mut results: Vec<Option<Result<ChainSnapshot, FetchError>>> = vec![None; peers.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => results[slot] = Some(result),
                Err(err) => warn!(%err, "peer fetch task failed"),
            }
        }

        results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| Err(FetchError::Unreachable("fetch task aborted".into())))
            })
            .collect()
    }

    /// Replace the ledger's chain with the longest valid peer chain, if any
    /// is longer than ours. Returns whether the chain was replaced.
    pub async fn resolve(&self, ledger: &SharedLedger, peers: &[String]) -> bool {
        let local_len = ledger.len().await;
        let results = self.fetch_all(peers).await;
        let candidate =
            select_longest(local_len, peers.iter().map(String::as_str).zip(results));

        match candidate {
            Some(chain) => ledger.replace_if_longer(chain).await,
            None => {
                info!(local_len, peers = peers.len(), "local chain is authoritative");
                false
            }
        }
    }
}

/// Pick the longest valid chain strictly longer than `local_len`.
///
/// Ties between peers go to the one seen first; a tie with the local
/// chain keeps the local chain.
pub fn select_longest<'a, I>(local_len: usize, results: I) -> Option<Vec<Block>>
where
    I: IntoIterator<Item = (&'a str, Result<ChainSnapshot, FetchError>)>,
{
    let mut max_length = local_len;
    let mut candidate = None;

    for (peer, result) in results {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(peer, %err, "skipping peer");
                continue;
            }
        };

        if !snapshot.is_consistent() {
            warn!(
                peer,
                advertised = snapshot.length,
                actual = snapshot.chain.len(),
                "skipping peer with inconsistent chain length"
            );
            continue;
        }

        if snapshot.length <= max_length {
            continue;
        }

        if let Err(err) = ChainValidator::validate(&snapshot.chain) {
            warn!(peer, %err, "rejecting invalid peer chain");
            continue;
        }

        max_length = snapshot.length;
        candidate = Some(snapshot.chain);
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use hashledger_consensus::valid_proof;
    use std::collections::HashMap;
    use std::sync::OnceLock;
    use std::time::Instant;

    /// One chain of 7 mined blocks; prefixes of it are valid chains too.
    fn mined_chain() -> &'static [Block] {
        static CHAIN: OnceLock<Vec<Block>> = OnceLock::new();
        CHAIN.get_or_init(|| {
            let mut ledger = Ledger::new();
            while ledger.len() < 7 {
                ledger.append_transaction(
                    hashledger_core::Transaction::new().with("height", ledger.len() as i64),
                );
                ledger.mine();
            }
            ledger.chain().to_vec()
        })
    }

    fn prefix(len: usize) -> Vec<Block> {
        mined_chain()[..len].to_vec()
    }

    /// Serves canned `/chain` bodies as JSON text, so every chain crosses
    /// the same encode and decode path it would between real nodes.
    #[derive(Default)]
    struct MockFetcher {
        responses: HashMap<String, Result<String, FetchError>>,
        delays: HashMap<String, Duration>,
    }

    impl MockFetcher {
        fn serve(mut self, peer: &str, chain: Vec<Block>) -> Self {
            let body = serde_json::to_string(&ChainSnapshot::new(chain)).unwrap();
            self.responses.insert(peer.to_string(), Ok(body));
            self
        }

        fn fail(mut self, peer: &str, err: FetchError) -> Self {
            self.responses.insert(peer.to_string(), Err(err));
            self
        }

        fn delay(mut self, peer: &str, delay: Duration) -> Self {
            self.delays.insert(peer.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl ChainFetcher for MockFetcher {
        async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, FetchError> {
            if let Some(delay) = self.delays.get(peer) {
                tokio::time::sleep(*delay).await;
            }
            let body = match self.responses.get(peer) {
                Some(Ok(body)) => body,
                Some(Err(err)) => return Err(err.clone()),
                None => return Err(FetchError::Unreachable(peer.to_string())),
            };
            serde_json::from_str(body).map_err(|err| FetchError::Decode(err.to_string()))
        }
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn resolver(fetcher: MockFetcher) -> ConsensusResolver<MockFetcher> {
        ConsensusResolver::new(fetcher, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_adopts_longest_valid_chain() {
        let mut invalid = prefix(5);
        invalid[4].previous_hash = "f".repeat(64);

        let fetcher = MockFetcher::default()
            .serve("a:1", invalid)
            .serve("b:2", prefix(7))
            .serve("c:3", prefix(6));
        let ledger = SharedLedger::new(Ledger::from_chain(prefix(4)).unwrap());

        let replaced = resolver(fetcher)
            .resolve(&ledger, &peers(&["a:1", "b:2", "c:3"]))
            .await;

        assert!(replaced);
        assert_eq!(ledger.snapshot().await.chain, prefix(7));
    }

    #[tokio::test]
    async fn test_keeps_local_chain_when_not_shorter() {
        let fetcher = MockFetcher::default()
            .serve("a:1", prefix(6))
            .serve("b:2", prefix(3))
            .fail("c:3", FetchError::Status(500));
        let ledger = SharedLedger::new(Ledger::from_chain(prefix(6)).unwrap());

        let replaced = resolver(fetcher)
            .resolve(&ledger, &peers(&["a:1", "b:2", "c:3"]))
            .await;

        assert!(!replaced);
        assert_eq!(ledger.snapshot().await.chain, prefix(6));
    }

    #[tokio::test]
    async fn test_adopts_chain_with_awkward_timestamps_over_json() {
        // 1700000000.0003703 does not survive a best-effort float parser
        let genesis = Block {
            index: 1,
            timestamp: 1700000000.0003703,
            transactions: Vec::new(),
            proof: hashledger_core::GENESIS_PROOF,
            previous_hash: hashledger_core::GENESIS_PREVIOUS_HASH.to_string(),
        };
        let mut remote = Ledger::from_chain(vec![genesis]).unwrap();
        remote.mine();
        remote.mine();
        assert!(ChainValidator::is_valid(remote.chain()));

        let fetcher = MockFetcher::default().serve("peer:1", remote.chain().to_vec());
        let ledger = SharedLedger::default();

        let replaced = resolver(fetcher).resolve(&ledger, &peers(&["peer:1"])).await;

        assert!(replaced);
        assert_eq!(ledger.snapshot().await.chain, remote.chain());
    }

    #[tokio::test]
    async fn test_no_peers() {
        let ledger = SharedLedger::default();
        assert!(!resolver(MockFetcher::default()).resolve(&ledger, &[]).await);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_unreachable_peers_are_skipped() {
        let fetcher = MockFetcher::default()
            .fail("down:1", FetchError::Unreachable("connection refused".into()))
            .fail("bad:2", FetchError::Decode("expected value".into()))
            .serve("up:3", prefix(5));
        let ledger = SharedLedger::default();

        let replaced = resolver(fetcher)
            .resolve(&ledger, &peers(&["down:1", "bad:2", "up:3", "ghost:4"]))
            .await;

        assert!(replaced);
        assert_eq!(ledger.len().await, 5);
    }

    #[tokio::test]
    async fn test_slow_peer_times_out_without_blocking_others() {
        let fetcher = MockFetcher::default()
            .serve("slow:1", prefix(7))
            .delay("slow:1", Duration::from_secs(30))
            .serve("fast:2", prefix(3));
        let ledger = SharedLedger::default();
        let resolver = ConsensusResolver::new(fetcher, Duration::from_millis(100));

        let started = Instant::now();
        let replaced = resolver
            .resolve(&ledger, &peers(&["slow:1", "fast:2"]))
            .await;

        assert!(replaced);
        assert_eq!(ledger.len().await, 3);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_peer_order() {
        let fetcher = MockFetcher::default()
            .serve("a:1", prefix(2))
            .delay("a:1", Duration::from_millis(50))
            .fail("b:2", FetchError::Timeout);

        let results = resolver(fetcher).fetch_all(&peers(&["a:1", "b:2"])).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().length, 2);
        assert_eq!(results[1], Err(FetchError::Timeout));
    }

    #[test]
    fn test_select_rejects_inconsistent_length() {
        let lying = ChainSnapshot {
            chain: prefix(2),
            length: 9,
        };

        let chosen = select_longest(1, [("liar:1", Ok(lying))]);

        assert!(chosen.is_none());
    }

    #[test]
    fn test_select_tie_prefers_first_peer() {
        let mut other = Ledger::new();
        other.mine();
        other.mine();
        let first = prefix(3);
        let second = other.chain().to_vec();
        assert_ne!(first, second);

        let chosen = select_longest(
            1,
            [
                ("a:1", Ok(ChainSnapshot::new(first.clone()))),
                ("b:2", Ok(ChainSnapshot::new(second))),
            ],
        );

        assert_eq!(chosen, Some(first));
    }

    #[test]
    fn test_select_equal_to_local_is_not_adopted() {
        let chosen = select_longest(4, [("a:1", Ok(ChainSnapshot::new(prefix(4))))]);
        assert!(chosen.is_none());
    }

    #[test]
    fn test_select_rejects_bad_proof() {
        let mut tampered = prefix(3);
        let parent_hash = tampered[1].hash_hex();
        let parent_proof = tampered[1].proof;
        tampered[2].proof = (0..)
            .find(|&p| !valid_proof(parent_proof, p, &parent_hash))
            .unwrap();

        let chosen = select_longest(1, [("a:1", Ok(ChainSnapshot::new(tampered)))]);

        assert!(chosen.is_none());
    }
}
