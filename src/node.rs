//! The node: orchestrates the routing table, transport, value store, and lookup engine.

use crate::config::NodeConfig;
use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::lookup::{self, LookupOutcome};
use crate::routing::RoutingTable;
use crate::store::{is_valid_key_hex, OriginSet, ValueStore};
use crate::transport::{Body, RequestSender, UdpTransport};
use std::sync::Arc;

/// A running Kademlia node.
pub struct Node {
    id: NodeId,
    config: NodeConfig,
    routing_table: Arc<RoutingTable>,
    store: Arc<ValueStore>,
    origins: Arc<OriginSet>,
    transport: UdpTransport,
    maintenance: tokio::task::JoinHandle<()>,
}

impl Node {
    /// Bind the listen address and start the reader and maintenance tasks.
    pub async fn bind(config: NodeConfig) -> Result<Self> {
        let id = config.node_id.unwrap_or_else(NodeId::random);
        let self_contact = Contact::new(id, config.listen);

        // Two-phase construction breaks the routing-table/transport cycle:
        // the sender (a `LivenessProbe`) must exist before the routing table
        // does, but the reader needs the routing table to observe into.
        let sender = UdpTransport::bind(config.listen, self_contact, config.rpc_timeout).await?;
        let routing_table = Arc::new(RoutingTable::new(id, Box::new(sender.clone())));

        let store = Arc::new(ValueStore::new());
        let origins = Arc::new(OriginSet::new());

        let transport = UdpTransport::spawn_reader(sender, routing_table.clone(), store.clone());

        let maintenance = crate::maintenance::spawn(
            routing_table.clone(),
            store.clone(),
            origins.clone(),
            transport.sender().clone(),
            id,
            config.k,
            config.alpha,
            config.republish_interval,
        );

        tracing::info!(node_id = %id, listen = %config.listen, "node started");

        Ok(Self {
            id,
            config,
            routing_table,
            store,
            origins,
            transport,
            maintenance,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn listen_addr(&self) -> std::net::SocketAddr {
        self.config.listen
    }

    /// Store `bytes`, returning its 40-hex content-hash key.
    pub async fn put(&self, bytes: &[u8]) -> Result<String> {
        let key_id = NodeId::content_hash(bytes);
        let key_hex = key_id.to_hex();

        self.store.store_local(key_hex.clone(), bytes).await;
        self.origins.insert(key_hex.clone()).await;

        replicate_to_closest(
            &self.routing_table,
            self.transport.sender(),
            self.id,
            self.config.k,
            self.config.alpha,
            &key_hex,
            bytes,
        )
        .await;

        Ok(key_hex)
    }

    /// Retrieve the value for `key_hex`, trying the local store first.
    pub async fn get(&self, key_hex: &str) -> Result<Option<(Vec<u8>, Contact)>> {
        if !is_valid_key_hex(key_hex) {
            return Err(Error::InvalidKey(key_hex.to_string()));
        }

        if let Some(value) = self.store.load_local(key_hex).await {
            return Ok(Some((value, self.self_contact())));
        }

        let key_id = match NodeId::from_hex(key_hex) {
            Some(id) => id,
            None => return Err(Error::InvalidKey(key_hex.to_string())),
        };

        let outcome = lookup::lookup_value(
            &key_id,
            key_hex,
            &self.routing_table,
            self.transport.sender(),
            self.config.alpha,
        )
        .await;

        match outcome {
            LookupOutcome::Value {
                value,
                responder,
                queried,
            } => {
                self.store.store_local(key_hex.to_string(), &value).await;
                self.path_cache(&key_id, key_hex, &value, &responder, &queried)
                    .await;
                Ok(Some((value, responder)))
            }
            LookupOutcome::Nodes(_) => Ok(None),
        }
    }

    /// Store to the closest on-path node other than the responder or self.
    async fn path_cache(
        &self,
        key_id: &NodeId,
        key_hex: &str,
        value: &[u8],
        responder: &Contact,
        queried: &[Contact],
    ) {
        let candidate = queried
            .iter()
            .filter(|c| c.id != responder.id && c.id != self.id)
            .min_by_key(|c| c.id.distance(key_id));

        if let Some(candidate) = candidate {
            let _ = self
                .transport
                .sender()
                .request(
                    candidate.address,
                    Body::Store {
                        key_hex: key_hex.to_string(),
                        value: value.to_vec(),
                    },
                )
                .await;
        }
    }

    /// `PING` the bootstrap peer, then look up our own id to populate the
    /// routing table around self.
    pub async fn bootstrap(&self) -> Result<()> {
        let Some(peer) = self.config.bootstrap else {
            return Ok(());
        };
        self.transport.sender().request(peer, Body::Ping).await?;
        lookup::lookup_node(
            &self.id,
            &self.routing_table,
            self.transport.sender(),
            self.config.alpha,
        )
        .await;
        Ok(())
    }

    fn self_contact(&self) -> Contact {
        Contact::new(self.id, self.config.listen)
    }

    /// Stop the maintenance task and the transport reader.
    pub async fn shutdown(self) {
        self.maintenance.abort();
        let _ = self.maintenance.await;
        self.transport.shutdown().await;
        tracing::info!(node_id = %self.id, "node shut down");
    }
}

/// Run a NODE-mode lookup to refresh the neighborhood, then `STORE` to each
/// of the current `K` closest contacts other than self. Shared by `put` and
/// the periodic republish task.
pub(crate) async fn replicate_to_closest(
    routing_table: &RoutingTable,
    sender: &RequestSender,
    self_id: NodeId,
    k: usize,
    alpha: usize,
    key_hex: &str,
    value: &[u8],
) {
    let key_id = match NodeId::from_hex(key_hex) {
        Some(id) => id,
        None => return,
    };

    lookup::lookup_node(&key_id, routing_table, sender, alpha).await;
    let targets = routing_table.closest(&key_id, k).await;

    for contact in targets.into_iter().filter(|c| c.id != self_id) {
        let _ = sender
            .request(
                contact.address,
                Body::Store {
                    key_hex: key_hex.to_string(),
                    value: value.to_vec(),
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(port: u16, bootstrap: Option<u16>) -> NodeConfig {
        NodeConfig {
            listen: format!("127.0.0.1:{port}").parse().unwrap(),
            bootstrap: bootstrap.map(|p| format!("127.0.0.1:{p}").parse().unwrap()),
            node_id: None,
            k: 20,
            alpha: 3,
            rpc_timeout: Duration::from_millis(200),
            republish_interval: Duration::from_secs(3600),
            verbosity: "info".to_string(),
        }
    }

    #[tokio::test]
    async fn put_and_get_round_trip_on_the_same_node() {
        let node = Node::bind(config(19101, None)).await.unwrap();
        let key = node.put(b"hello world").await.unwrap();
        assert_eq!(key, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");

        let (value, _responder) = node.get(&key).await.unwrap().unwrap();
        assert_eq!(value, b"hello world");
        node.shutdown().await;
    }

    #[tokio::test]
    async fn get_with_invalid_key_length_is_rejected_without_network_traffic() {
        let node = Node::bind(config(19102, None)).await.unwrap();
        let result = node.get("abc").await;
        assert!(matches!(result, Err(Error::InvalidKey(_))));
        node.shutdown().await;
    }

    #[tokio::test]
    async fn bootstrapped_node_can_fetch_value_stored_on_peer() {
        let a = Node::bind(config(19103, None)).await.unwrap();
        let b = Node::bind(config(19104, Some(19103))).await.unwrap();
        b.bootstrap().await.unwrap();

        let key = b.put(b"hello world").await.unwrap();
        let result = a.get(&key).await.unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().0, b"hello world");

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn get_of_unknown_key_is_not_found() {
        let a = Node::bind(config(19105, None)).await.unwrap();
        let b = Node::bind(config(19106, Some(19105))).await.unwrap();
        b.bootstrap().await.unwrap();

        let missing = "00112233445566778899aabbccddeeff00112233";
        let result = b.get(missing).await.unwrap();
        assert!(result.is_none());

        a.shutdown().await;
        b.shutdown().await;
    }
}
