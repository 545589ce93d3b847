//! Startup configuration: CLI flags and the immutable config they produce.

use crate::id::NodeId;
use crate::routing::K as DEFAULT_K;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_ALPHA: usize = 3;
const DEFAULT_RPC_TIMEOUT_MS: u64 = 800;
const DEFAULT_REPUBLISH_INTERVAL_SECS: u64 = 15 * 60;

/// Command-line flags for the `kadnode` binary.
#[derive(Debug, Parser)]
#[command(name = "kadnode", about = "A Kademlia distributed hash table node")]
pub struct Args {
    /// Address to bind and announce. Must be concrete and routable, never a wildcard.
    #[arg(long)]
    pub listen: SocketAddr,

    /// Peer address to bootstrap through.
    #[arg(long)]
    pub bootstrap: Option<SocketAddr>,

    /// Explicit 40-hex NodeId. Random 160 bits are drawn if omitted.
    #[arg(long)]
    pub node_id: Option<String>,

    /// Bucket capacity and replication factor.
    #[arg(long, default_value_t = DEFAULT_K)]
    pub k: usize,

    /// Lookup parallelism.
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: usize,

    /// Per-RPC timeout, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_RPC_TIMEOUT_MS)]
    pub rpc_timeout_ms: u64,

    /// Interval between origin-key republish passes, in seconds.
    #[arg(long, default_value_t = DEFAULT_REPUBLISH_INTERVAL_SECS)]
    pub republish_interval_secs: u64,

    /// Log verbosity, forwarded to the `tracing_subscriber` env filter.
    #[arg(long, default_value = "info")]
    pub verbosity: String,
}

/// Immutable node configuration, built once at startup from [`Args`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    pub bootstrap: Option<SocketAddr>,
    pub node_id: Option<NodeId>,
    pub k: usize,
    pub alpha: usize,
    pub rpc_timeout: Duration,
    pub republish_interval: Duration,
    pub verbosity: String,
}

impl NodeConfig {
    pub fn from_args(args: &Args) -> crate::error::Result<Self> {
        let node_id = match &args.node_id {
            Some(hex) => Some(
                NodeId::from_hex(hex)
                    .ok_or_else(|| crate::error::Error::Config(format!("invalid --node-id: {hex}")))?,
            ),
            None => None,
        };

        Ok(Self {
            listen: args.listen,
            bootstrap: args.bootstrap,
            node_id,
            k: args.k,
            alpha: args.alpha,
            rpc_timeout: Duration::from_millis(args.rpc_timeout_ms),
            republish_interval: Duration::from_secs(args.republish_interval_secs),
            verbosity: args.verbosity.clone(),
        })
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:0".parse().unwrap(),
            bootstrap: None,
            node_id: None,
            k: DEFAULT_K,
            alpha: DEFAULT_ALPHA,
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            republish_interval: Duration::from_secs(DEFAULT_REPUBLISH_INTERVAL_SECS),
            verbosity: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_node_id_is_rejected() {
        let args = Args {
            listen: "127.0.0.1:9000".parse().unwrap(),
            bootstrap: None,
            node_id: Some("not-hex".to_string()),
            k: DEFAULT_K,
            alpha: DEFAULT_ALPHA,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            republish_interval_secs: DEFAULT_REPUBLISH_INTERVAL_SECS,
            verbosity: "info".to_string(),
        };
        assert!(NodeConfig::from_args(&args).is_err());
    }

    #[test]
    fn default_config_uses_spec_constants() {
        let config = NodeConfig::default();
        assert_eq!(config.k, 20);
        assert_eq!(config.alpha, 3);
    }
}
