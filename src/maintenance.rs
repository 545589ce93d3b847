//! Periodic republish of origin keys, for eventual placement under churn.

use crate::id::NodeId;
use crate::node::replicate_to_closest;
use crate::routing::RoutingTable;
use crate::store::{OriginSet, ValueStore};
use crate::transport::RequestSender;
use std::sync::Arc;
use std::time::Duration;

/// Spawn the republish task. Snapshots the origin key set under its lock,
/// then loads and re-replicates each value with no store or origin-set lock
/// held during the network I/O (SPEC_FULL §4.6, §5).
pub fn spawn(
    routing_table: Arc<RoutingTable>,
    store: Arc<ValueStore>,
    origins: Arc<OriginSet>,
    sender: RequestSender,
    self_id: NodeId,
    k: usize,
    alpha: usize,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so republish only runs
        // after a full interval has elapsed since startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            republish_once(&routing_table, &store, &origins, &sender, self_id, k, alpha).await;
        }
    })
}

async fn republish_once(
    routing_table: &RoutingTable,
    store: &ValueStore,
    origins: &OriginSet,
    sender: &RequestSender,
    self_id: NodeId,
    k: usize,
    alpha: usize,
) {
    let keys = origins.snapshot().await;
    log::debug!("republish: {} origin keys", keys.len());

    for key_hex in keys {
        let Some(value) = store.load_local(&key_hex).await else {
            continue;
        };
        replicate_to_closest(routing_table, sender, self_id, k, alpha, &key_hex, &value).await;
    }
}
