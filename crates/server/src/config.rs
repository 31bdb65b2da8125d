//! Node configuration from command-line flags and environment.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Errors in user-supplied configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fetch timeout must be at least one second")]
    ZeroTimeout,

    #[error("invalid log filter {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Parser)]
#[command(name = "hashledger")]
#[command(about = "A proof-of-work ledger node", long_about = None)]
pub struct NodeArgs {
    /// Address to bind the HTTP API to
    #[arg(long, env = "HASHLEDGER_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "HASHLEDGER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Peer to register at startup (repeatable, or comma separated)
    #[arg(long = "peer", env = "HASHLEDGER_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Seconds to wait for a peer's chain during conflict resolution
    #[arg(long, env = "HASHLEDGER_FETCH_TIMEOUT_SECS", default_value_t = 5)]
    pub fetch_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "HASHLEDGER_LOG", default_value = "info")]
    pub log_level: String,
}

/// Validated node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    pub bootstrap_peers: Vec<String>,
    pub fetch_timeout: Duration,
    pub log_level: String,
}

impl TryFrom<NodeArgs> for NodeConfig {
    type Error = ConfigError;

    fn try_from(args: NodeArgs) -> Result<Self, Self::Error> {
        if args.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if tracing_subscriber::EnvFilter::try_new(&args.log_level).is_err() {
            return Err(ConfigError::InvalidLogLevel(args.log_level));
        }

        Ok(Self {
            listen: SocketAddr::new(args.host, args.port),
            bootstrap_peers: args.peers,
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            log_level: args.log_level,
        })
    }
}
