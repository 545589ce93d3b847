//! The α-parallel iterative lookup engine: the heart of the system.
//!
//! Parameterized by a target id and a mode (NODE or VALUE). See SPEC_FULL §4.5.

use crate::contact::Contact;
use crate::id::NodeId;
use crate::routing::{RoutingTable, K};
use crate::transport::{Body, RequestSender};
use futures::future::join_all;
use std::collections::HashSet;

/// Width of the routing-table window consulted each round before picking the
/// next α candidates. Larger than K so that freshly-observed contacts from
/// this round's responses are visible to the next round's candidate pick.
pub const CLOSEST_LOOKUP_WINDOW: usize = 1024;

/// Safety bound on round count; convergence should end lookups long before this.
const MAX_ROUNDS: usize = 64;

pub enum LookupOutcome {
    /// NODE mode (or VALUE mode with no value found): the final closest contacts.
    Nodes(Vec<Contact>),
    /// VALUE mode success: the value, the contact that returned it, and every
    /// contact queried during the lookup (for path caching).
    Value {
        value: Vec<u8>,
        responder: Contact,
        queried: Vec<Contact>,
    },
}

enum Mode<'a> {
    Node,
    Value { key_hex: &'a str },
}

/// Run a NODE-mode lookup for `target`, returning `closest(target, K)` after convergence.
pub async fn lookup_node(
    target: &NodeId,
    routing_table: &RoutingTable,
    sender: &RequestSender,
    alpha: usize,
) -> Vec<Contact> {
    match run(target, Mode::Node, routing_table, sender, alpha).await {
        LookupOutcome::Nodes(contacts) => contacts,
        LookupOutcome::Value { .. } => unreachable!("NODE mode never returns Value"),
    }
}

/// Run a VALUE-mode lookup for `key_hex` (whose id is `target`).
pub async fn lookup_value(
    target: &NodeId,
    key_hex: &str,
    routing_table: &RoutingTable,
    sender: &RequestSender,
    alpha: usize,
) -> LookupOutcome {
    run(target, Mode::Value { key_hex }, routing_table, sender, alpha).await
}

async fn run(
    target: &NodeId,
    mode: Mode<'_>,
    routing_table: &RoutingTable,
    sender: &RequestSender,
    alpha: usize,
) -> LookupOutcome {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queried: Vec<Contact> = Vec::new();

    let shortlist = routing_table.closest(target, 3 * K).await;
    if shortlist.is_empty() {
        return LookupOutcome::Nodes(Vec::new());
    }

    let mut previous_closest = routing_table
        .closest_one(target)
        .await
        .map(|c| c.id.distance(target));

    for _round in 0..MAX_ROUNDS {
        let window = routing_table.closest(target, CLOSEST_LOOKUP_WINDOW).await;
        let batch: Vec<Contact> = window
            .into_iter()
            .filter(|c| !visited.contains(&c.id))
            .take(alpha)
            .collect();

        if batch.is_empty() {
            break;
        }
        for c in &batch {
            visited.insert(c.id);
            queried.push(*c);
        }

        let body_for = |c: &Contact| -> Body {
            match &mode {
                Mode::Node => Body::FindNode {
                    target_id_hex: target.to_hex(),
                },
                Mode::Value { key_hex } => Body::FindValue {
                    key_hex: key_hex.to_string(),
                },
            }
        };

        let futures = batch.iter().map(|c| {
            let body = body_for(c);
            let address = c.address;
            async move { sender.request(address, body).await }
        });
        let results = join_all(futures).await;

        for result in results {
            let envelope = match result {
                Ok(envelope) => envelope,
                Err(_) => continue,
            };
            match envelope.body {
                Body::FindNodeOk { contacts } => {
                    for c in contacts {
                        routing_table.observe(c).await;
                    }
                }
                Body::FindValueOk { value, contacts } => {
                    if let Some(value) = value {
                        return LookupOutcome::Value {
                            value,
                            responder: envelope.sender,
                            queried,
                        };
                    }
                    for c in contacts {
                        routing_table.observe(c).await;
                    }
                }
                _ => {}
            }
        }

        let current_closest = routing_table
            .closest_one(target)
            .await
            .map(|c| c.id.distance(target));

        let improved = match (current_closest, previous_closest) {
            (Some(cur), Some(prev)) => cur < prev,
            (Some(_), None) => true,
            _ => false,
        };
        if !improved {
            break;
        }
        previous_closest = current_closest;
    }

    LookupOutcome::Nodes(routing_table.closest(target, K).await)
}
