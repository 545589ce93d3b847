//! RPC handlers: pure request-to-response logic invoked by the transport reader.
//!
//! Handlers never retry and never generate follow-up RPCs (SPEC_FULL §4.4).

use crate::id::NodeId;
use crate::routing::{RoutingTable, K};
use crate::store::{is_valid_key_hex, ValueStore};
use crate::transport::message::Body;

/// Handle a single request body and produce its response body, or `None` if
/// `body` is not a request kind (the reader should never call this for a
/// response; `None` here indicates a logic error upstream).
pub async fn dispatch(body: Body, routing_table: &RoutingTable, store: &ValueStore) -> Option<Body> {
    match body {
        Body::Ping => Some(Body::Pong),
        Body::FindNode { target_id_hex } => Some(handle_find_node(routing_table, &target_id_hex).await),
        Body::Store { key_hex, value } => Some(handle_store(store, key_hex, value).await),
        Body::FindValue { key_hex } => Some(handle_find_value(routing_table, store, &key_hex).await),
        Body::Pong | Body::FindNodeOk { .. } | Body::FindValueOk { .. } | Body::StoreOk => None,
    }
}

async fn handle_find_node(routing_table: &RoutingTable, target_id_hex: &str) -> Body {
    let contacts = match NodeId::from_hex(target_id_hex) {
        Some(target) => routing_table.closest(&target, K).await,
        None => Vec::new(),
    };
    Body::FindNodeOk { contacts }
}

async fn handle_store(store: &ValueStore, key_hex: String, value: Vec<u8>) -> Body {
    if is_valid_key_hex(&key_hex) {
        store.store_local(key_hex, &value).await;
    } else {
        log::warn!("dropping STORE with malformed key");
    }
    Body::StoreOk
}

async fn handle_find_value(routing_table: &RoutingTable, store: &ValueStore, key_hex: &str) -> Body {
    if let Some(value) = store.load_local(key_hex).await {
        return Body::FindValueOk {
            value: Some(value),
            contacts: Vec::new(),
        };
    }
    let contacts = match NodeId::from_hex(key_hex) {
        Some(target) => routing_table.closest(&target, K).await,
        None => Vec::new(),
    };
    Body::FindValueOk {
        value: None,
        contacts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use crate::routing::table::LivenessProbe;
    use async_trait::async_trait;

    struct AlwaysAlive;
    #[async_trait]
    impl LivenessProbe for AlwaysAlive {
        async fn probe(&self, _contact: &Contact) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn ping_yields_pong() {
        let table = RoutingTable::new(NodeId::random(), Box::new(AlwaysAlive));
        let store = ValueStore::new();
        let resp = dispatch(Body::Ping, &table, &store).await;
        assert!(matches!(resp, Some(Body::Pong)));
    }

    #[tokio::test]
    async fn store_then_find_value_returns_value() {
        let table = RoutingTable::new(NodeId::random(), Box::new(AlwaysAlive));
        let store = ValueStore::new();
        let key = NodeId::content_hash(b"hello world").to_hex();
        dispatch(
            Body::Store {
                key_hex: key.clone(),
                value: b"hello world".to_vec(),
            },
            &table,
            &store,
        )
        .await;

        let resp = dispatch(Body::FindValue { key_hex: key }, &table, &store).await;
        match resp {
            Some(Body::FindValueOk { value, contacts }) => {
                assert_eq!(value, Some(b"hello world".to_vec()));
                assert!(contacts.is_empty());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_value_miss_returns_closest_contacts() {
        let owner = NodeId::random();
        let table = RoutingTable::new(owner, Box::new(AlwaysAlive));
        let peer = Contact::new(NodeId::random(), "127.0.0.1:9001".parse().unwrap());
        table.observe(peer).await;

        let missing_key = NodeId::random().to_hex();
        let resp = dispatch(Body::FindValue { key_hex: missing_key }, &table, &store_fixture()).await;
        match resp {
            Some(Body::FindValueOk { value, contacts }) => {
                assert!(value.is_none());
                assert_eq!(contacts, vec![peer]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    fn store_fixture() -> ValueStore {
        ValueStore::new()
    }

    #[tokio::test]
    async fn malformed_store_key_is_dropped_not_stored() {
        let table = RoutingTable::new(NodeId::random(), Box::new(AlwaysAlive));
        let store = ValueStore::new();
        dispatch(
            Body::Store {
                key_hex: "not-hex".to_string(),
                value: b"x".to_vec(),
            },
            &table,
            &store,
        )
        .await;
        assert!(!store.contains("not-hex").await);
    }
}
