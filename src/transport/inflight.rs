//! Single-capacity completion slots keyed by message id.

use crate::transport::message::{Envelope, MessageId};
use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};

/// Tracks outstanding requests awaiting a response.
///
/// At most one waiter per [`MessageId`]; the table lock only guards
/// registration and removal, never the deposit itself (SPEC_FULL §5).
#[derive(Default)]
pub struct InflightTable {
    slots: Mutex<HashMap<MessageId, oneshot::Sender<Envelope>>>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh waiter for `id`, returning the receiving half.
    pub async fn register(&self, id: MessageId) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().await.insert(id, tx);
        rx
    }

    /// Remove the waiter for `id` without completing it (timeout or cancellation).
    pub async fn remove(&self, id: &MessageId) {
        self.slots.lock().await.remove(id);
    }

    /// Deposit a response. If no waiter exists, or it was already fulfilled,
    /// the envelope is silently discarded.
    pub async fn complete(&self, envelope: Envelope) {
        let sender = self.slots.lock().await.remove(&envelope.message_id);
        if let Some(sender) = sender {
            let _ = sender.send(envelope);
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use crate::id::NodeId;
    use crate::transport::message::Body;
    use uuid::Uuid;

    fn envelope(id: MessageId) -> Envelope {
        let sender = Contact::new(NodeId::random(), "127.0.0.1:9000".parse().unwrap());
        Envelope::new(id, sender, Body::Pong)
    }

    #[tokio::test]
    async fn complete_delivers_to_registered_waiter() {
        let table = InflightTable::new();
        let id = Uuid::new_v4();
        let rx = table.register(id).await;
        table.complete(envelope(id)).await;
        let got = rx.await.unwrap();
        assert_eq!(got.message_id, id);
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn complete_with_no_waiter_is_dropped() {
        let table = InflightTable::new();
        table.complete(envelope(Uuid::new_v4())).await;
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn remove_cleans_up_without_completing() {
        let table = InflightTable::new();
        let id = Uuid::new_v4();
        let rx = table.register(id).await;
        table.remove(&id).await;
        assert_eq!(table.len().await, 0);
        assert!(rx.await.is_err());
    }
}
