//! HTTP client for pulling chains from peer nodes.

use async_trait::async_trait;
use hashledger_chain::{ChainFetcher, FetchError};
use hashledger_core::ChainSnapshot;
use reqwest::Client;
use std::time::Duration;

/// Fetches `GET http://{peer}/chain` from peer nodes.
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: Client,
}

impl HttpChainFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()?;
        Ok(Self { client })
    }

    fn chain_url(peer: &str) -> String {
        format!("http://{}/chain", peer)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() || err.is_body() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, FetchError> {
        let response = self
            .client
            .get(Self::chain_url(peer))
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<ChainSnapshot>().await.map_err(classify)
    }
}
