//! Datagram transport: wire envelopes, request/response correlation, and the socket reader.

pub mod inflight;
pub mod message;
pub mod socket;

pub use inflight::InflightTable;
pub use message::{Body, Envelope, MessageId, MAX_DATAGRAM_SIZE};
pub use socket::{RequestSender, UdpTransport};
