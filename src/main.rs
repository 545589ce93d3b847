//! kadnode CLI: parses startup flags, brings a node up, and runs the
//! interactive put/get shell over stdin/stdout.

mod cli;

use clap::Parser;
use kadnode::config::{Args, NodeConfig};
use kadnode::{Node, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    use tracing_subscriber::{fmt, EnvFilter};
    fmt().with_env_filter(EnvFilter::new(&args.verbosity)).init();

    let config = NodeConfig::from_args(&args)?;
    let node = Node::bind(config).await?;

    tracing::info!(node_id = %node.id(), "kadnode ready");

    if let Err(e) = node.bootstrap().await {
        tracing::warn!("bootstrap failed: {e}");
    }

    cli::run(&node).await?;

    node.shutdown().await;
    Ok(())
}
