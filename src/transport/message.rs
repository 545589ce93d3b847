//! The wire envelope and its payload variants.

use crate::contact::Contact;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum encoded envelope size, bounded by the UDP receive buffer.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// 128-bit message identifier. A response echoes its request's id verbatim.
pub type MessageId = Uuid;

/// A self-describing envelope exchanged between nodes.
///
/// Serialized as newline-free JSON; see SPEC_FULL §6 for the rationale
/// (human-readable, matches the teacher's existing `serde_json` usage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message_id: MessageId,
    pub sender: Contact,
    #[serde(flatten)]
    pub body: Body,
}

impl Envelope {
    pub fn new(message_id: MessageId, sender: Contact, body: Body) -> Self {
        Self {
            message_id,
            sender,
            body,
        }
    }

    /// Whether this envelope is a response to some earlier request.
    pub fn is_response(&self) -> bool {
        matches!(
            self.body,
            Body::Pong | Body::FindNodeOk { .. } | Body::FindValueOk { .. } | Body::StoreOk
        )
    }
}

/// Kind-tagged payload. The `kind` field is the wire discriminant; unknown
/// kinds fail to deserialize and the datagram is dropped by the reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Body {
    Ping,
    Pong,
    FindNode { target_id_hex: String },
    FindNodeOk { contacts: Vec<Contact> },
    FindValue { key_hex: String },
    FindValueOk {
        value: Option<Vec<u8>>,
        contacts: Vec<Contact>,
    },
    Store { key_hex: String, value: Vec<u8> },
    StoreOk,
}
