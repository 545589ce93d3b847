//! Contact: a peer's identity plus its last-known transport address.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// A peer's id and the address it was last reachable at.
///
/// Address may be stale until the next successful contact; the routing table
/// refreshes it on every observation (see `RoutingTable::observe`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: NodeId,
    pub address: SocketAddr,
}

impl Contact {
    pub fn new(id: NodeId, address: SocketAddr) -> Self {
        Self { id, address }
    }
}
