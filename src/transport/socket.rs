//! UDP transport: send/receive, request/response correlation, and the single reader task.

use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::handlers;
use crate::routing::{LivenessProbe, RoutingTable};
use crate::store::ValueStore;
use crate::transport::inflight::InflightTable;
use crate::transport::message::{Body, Envelope, MessageId, MAX_DATAGRAM_SIZE};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use uuid::Uuid;

/// The narrow capability needed to send a request and await its response.
///
/// Deliberately holds only the socket and the inflight table, never a handle
/// back to the routing table or the node, so it can also serve as the
/// routing table's [`LivenessProbe`] without creating a reference cycle
/// (SPEC_FULL §9).
#[derive(Clone)]
pub struct RequestSender {
    socket: Arc<UdpSocket>,
    inflight: Arc<InflightTable>,
    self_contact: Contact,
    timeout: Duration,
}

impl RequestSender {
    pub fn new(
        socket: Arc<UdpSocket>,
        inflight: Arc<InflightTable>,
        self_contact: Contact,
        timeout: Duration,
    ) -> Self {
        Self {
            socket,
            inflight,
            self_contact,
            timeout,
        }
    }

    /// Send a request and await its matching response, or a timeout.
    pub async fn request(&self, to: SocketAddr, body: Body) -> Result<Envelope> {
        let message_id = Uuid::new_v4();
        let rx = self.inflight.register(message_id).await;
        let envelope = Envelope::new(message_id, self.self_contact, body);

        let encoded = serde_json::to_vec(&envelope)?;
        if encoded.len() > MAX_DATAGRAM_SIZE {
            self.inflight.remove(&message_id).await;
            return Err(Error::ValueTooLarge(encoded.len()));
        }

        self.socket.send_to(&encoded, to).await?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(_)) => {
                self.inflight.remove(&message_id).await;
                Err(Error::TransportClosed)
            }
            Err(_) => {
                self.inflight.remove(&message_id).await;
                Err(Error::Timeout)
            }
        }
    }

    /// Send a response envelope, reusing the request's message id. Fire and
    /// forget: handlers never retry (SPEC_FULL §4.4).
    pub async fn respond(&self, to: SocketAddr, message_id: MessageId, body: Body) -> Result<()> {
        let envelope = Envelope::new(message_id, self.self_contact, body);
        let encoded = serde_json::to_vec(&envelope)?;
        self.socket.send_to(&encoded, to).await?;
        Ok(())
    }

    pub fn self_contact(&self) -> Contact {
        self.self_contact
    }

    fn inflight(&self) -> Arc<InflightTable> {
        self.inflight.clone()
    }
}

#[async_trait]
impl LivenessProbe for RequestSender {
    async fn probe(&self, contact: &Contact) -> bool {
        self.request(contact.address, Body::Ping).await.is_ok()
    }
}

/// Owns the receive side of the socket and runs the single reader task.
pub struct UdpTransport {
    sender: RequestSender,
    reader: tokio::task::JoinHandle<()>,
}

impl UdpTransport {
    /// Bind `listen` and build the request sender, without starting the
    /// reader yet.
    ///
    /// Split from [`UdpTransport::spawn_reader`] because the routing table
    /// needs a [`LivenessProbe`] (the sender, once built) at its own
    /// construction time, while the reader needs the routing table: binding
    /// first breaks that cycle without either side holding a handle back to
    /// the other (SPEC_FULL §9).
    pub async fn bind(
        listen: SocketAddr,
        self_contact: Contact,
        rpc_timeout: Duration,
    ) -> Result<RequestSender> {
        let socket = Arc::new(UdpSocket::bind(listen).await?);
        let inflight = Arc::new(InflightTable::new());
        Ok(RequestSender::new(socket, inflight, self_contact, rpc_timeout))
    }

    /// Start the single reader task against an already-built `sender`.
    pub fn spawn_reader(
        sender: RequestSender,
        routing_table: Arc<RoutingTable>,
        store: Arc<ValueStore>,
    ) -> Self {
        let socket = sender.socket.clone();
        let inflight = sender.inflight();
        let reader = tokio::spawn(Self::run_reader(
            socket,
            inflight,
            sender.clone(),
            routing_table,
            store,
        ));

        Self { sender, reader }
    }

    async fn run_reader(
        socket: Arc<UdpSocket>,
        inflight: Arc<InflightTable>,
        sender: RequestSender,
        routing_table: Arc<RoutingTable>,
        store: Arc<ValueStore>,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (n, from) = match socket.recv_from(&mut buf).await {
                Ok(pair) => pair,
                Err(e) => {
                    log::error!("transport reader exiting: {e}");
                    return;
                }
            };

            let envelope: Envelope = match serde_json::from_slice(&buf[..n]) {
                Ok(env) => env,
                Err(e) => {
                    log::debug!("dropping malformed datagram from {from}: {e}");
                    continue;
                }
            };

            // `observe` may run the liveness probe, which sends a PING on
            // this same socket and awaits its PONG through `inflight` —
            // delivered by this very reader loop. Spawned rather than
            // awaited inline, so a full-bucket observation can never park
            // the reader behind its own correlation path (SPEC_FULL §4.3,
            // §5: the reader's only suspension is the socket receive).
            let observed = envelope.sender;
            let observe_table = routing_table.clone();
            tokio::spawn(async move {
                observe_table.observe(observed).await;
            });

            if envelope.is_response() {
                inflight.complete(envelope).await;
                continue;
            }

            let message_id = envelope.message_id;
            let routing_table = routing_table.clone();
            let store = store.clone();
            let sender = sender.clone();
            tokio::spawn(async move {
                if let Some(response) = handlers::dispatch(envelope.body, &routing_table, &store).await {
                    if let Err(e) = sender.respond(from, message_id, response).await {
                        log::debug!("failed to send response to {from}: {e}");
                    }
                }
            });
        }
    }

    pub fn sender(&self) -> &RequestSender {
        &self.sender
    }

    /// Close the socket's reader side, causing the reader task to exit.
    pub async fn shutdown(self) {
        self.reader.abort();
        let _ = self.reader.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;

    async fn spawn_node(port: u16) -> (UdpTransport, Arc<RoutingTable>, Arc<ValueStore>) {
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let contact = Contact::new(NodeId::random(), addr);
        let sender = UdpTransport::bind(addr, contact, Duration::from_millis(200))
            .await
            .unwrap();
        let routing_table = Arc::new(RoutingTable::new(contact.id, Box::new(sender.clone())));
        let store = Arc::new(ValueStore::new());
        let transport = UdpTransport::spawn_reader(sender, routing_table.clone(), store.clone());
        (transport, routing_table, store)
    }

    #[tokio::test]
    async fn ping_round_trip_between_two_sockets() {
        let (a, _rt_a, _store_a) = spawn_node(19001).await;
        let (b, _rt_b, _store_b) = spawn_node(19002).await;

        let response = a
            .sender()
            .request("127.0.0.1:19002".parse().unwrap(), Body::Ping)
            .await
            .unwrap();
        assert!(matches!(response.body, Body::Pong));

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn request_to_dead_address_times_out() {
        let (a, _rt, _store) = spawn_node(19003).await;
        let result = a
            .sender()
            .request("127.0.0.1:19999".parse().unwrap(), Body::Ping)
            .await;
        assert!(matches!(result, Err(Error::Timeout)));
        a.shutdown().await;
    }

    #[tokio::test]
    async fn inbound_message_is_observed_into_routing_table() {
        let (a, rt_a, _store_a) = spawn_node(19004).await;
        let (b, _rt_b, _store_b) = spawn_node(19005).await;

        let _ = a
            .sender()
            .request("127.0.0.1:19005".parse().unwrap(), Body::Ping)
            .await
            .unwrap();

        assert_eq!(rt_a.len().await, 1);
        a.shutdown().await;
        b.shutdown().await;
    }
}
