//! Routing table: 160 k-buckets indexed by distance-bit from the owner.

use crate::contact::Contact;
use crate::id::{NodeId, ID_BITS};
use crate::routing::bucket::{InsertOutcome, KBucket};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Capability to check whether a contact is still alive, supplied by the
/// transport layer and injected into the routing table at construction.
///
/// Implementations must not hold any routing-table lock and must not keep a
/// reference back to the table or the node — see SPEC_FULL §9 on cyclic
/// references.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, contact: &Contact) -> bool;
}

/// A routing table owned by a single node.
///
/// A contact with id `X` belongs to the bucket at index
/// `owner.bucket_index(X)`; the owner's own id is never stored.
pub struct RoutingTable {
    owner: NodeId,
    buckets: Vec<RwLock<KBucket>>,
    probe: Box<dyn LivenessProbe>,
}

impl RoutingTable {
    pub fn new(owner: NodeId, probe: Box<dyn LivenessProbe>) -> Self {
        let mut buckets = Vec::with_capacity(ID_BITS);
        buckets.resize_with(ID_BITS, || RwLock::new(KBucket::new()));
        Self {
            owner,
            buckets,
            probe,
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Record (or refresh) an observation of `contact`. See SPEC_FULL §4.2.
    pub async fn observe(&self, contact: Contact) {
        if contact.id == self.owner {
            return;
        }
        let idx = self.owner.bucket_index(&contact.id);

        // Snapshot-then-release: decide whether eviction is needed under the
        // lock, then drop the guard before any probing I/O.
        let eviction_lru = {
            let mut bucket = self.buckets[idx].write().await;
            if bucket.touch(contact) {
                None
            } else {
                match bucket.try_insert(contact) {
                    InsertOutcome::Inserted => None,
                    InsertOutcome::Full { lru } => Some(lru),
                }
            }
        };

        if let Some(lru) = eviction_lru {
            let alive = self.probe.probe(&lru).await;
            let mut bucket = self.buckets[idx].write().await;
            bucket.resolve_eviction(lru, contact, alive);
        }
    }

    /// Up to `n` contacts closest to `target`, ascending by distance.
    ///
    /// Gathers the target's own bucket first, then expands outward by index
    /// until at least `n` candidates are collected or all buckets are
    /// exhausted.
    pub async fn closest(&self, target: &NodeId, n: usize) -> Vec<Contact> {
        let idx = self.owner.bucket_index(target);
        let max_d = idx.max(ID_BITS - 1 - idx);

        let mut collected: Vec<Contact> = Vec::new();
        for d in 0..=max_d {
            if collected.len() >= n {
                break;
            }
            if d == 0 {
                collected.extend(self.buckets[idx].read().await.iter().copied());
                continue;
            }
            if idx + d < ID_BITS {
                collected.extend(self.buckets[idx + d].read().await.iter().copied());
            }
            if d <= idx {
                collected.extend(self.buckets[idx - d].read().await.iter().copied());
            }
        }

        collected.sort_by_key(|c| c.id.distance(target));
        collected.truncate(n);
        collected
    }

    /// The single closest known contact to `target`, if any is known.
    pub async fn closest_one(&self, target: &NodeId) -> Option<Contact> {
        self.closest(target, 1).await.into_iter().next()
    }

    /// Total number of contacts across all buckets (for diagnostics/tests).
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for bucket in &self.buckets {
            total += bucket.read().await.len();
        }
        total
    }
}
