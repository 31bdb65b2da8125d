//! Registry of known peer nodes.
//!
//! Peers are keyed by network location (`host[:port]`), so
//! `http://10.0.0.5:5000` and `10.0.0.5:5000` name the same peer.

use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

/// Errors that can occur while registering peers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("invalid peer address: {0:?}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, PeerError>;

/// Outcome of a batch registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Normalized keys of accepted addresses, in input order.
    pub registered: Vec<String>,
    /// Addresses that failed to parse, with the reason.
    pub rejected: Vec<(String, PeerError)>,
}

/// Reduce an address to its peer key.
///
/// Addresses with a scheme (`http://host:port/path`) reduce to their network
/// location exactly as written. Bare addresses (`host:port`) are kept
/// verbatim.
pub fn normalize_address(address: &str) -> Result<String> {
    let invalid = || PeerError::InvalidAddress(address.to_string());
    let trimmed = address.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    match trimmed.split_once("://") {
        Some((_, rest)) => {
            let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
            if parsed.host_str().map_or(true, str::is_empty) {
                return Err(invalid());
            }
            let end = rest
                .find(|c: char| matches!(c, '/' | '?' | '#'))
                .unwrap_or(rest.len());
            Ok(rest[..end].to_string())
        }
        None => Ok(trimmed.to_string()),
    }
}

/// Set of unique peer network locations.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Re-registering a known peer is a no-op.
    ///
    /// Returns the normalized key the peer is stored under.
    pub fn register(&mut self, address: &str) -> Result<String> {
        let key = normalize_address(address)?;
        self.peers.insert(key.clone());
        Ok(key)
    }

    /// Register every address independently.
    ///
    /// Invalid entries are reported and skipped; valid entries before and
    /// after them are still registered.
    pub fn register_all<I, S>(&mut self, addresses: I) -> RegistrationReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RegistrationReport::default();
        for address in addresses {
            let address = address.as_ref();
            match self.register(address) {
                Ok(key) => report.registered.push(key),
                Err(err) => report.rejected.push((address.to_string(), err)),
            }
        }
        report
    }

    /// Known peers in sorted order.
    pub fn peers(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.peers.contains(key)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
