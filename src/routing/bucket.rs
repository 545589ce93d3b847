//! A single k-bucket: bounded MRU/LRU main list plus a replacement cache.

use crate::contact::Contact;
use crate::id::NodeId;
use std::collections::VecDeque;

/// Bucket capacity (replication factor K).
pub const K: usize = 20;
/// Replacement-cache capacity.
pub const R: usize = 32;

/// Outcome of attempting to insert a new (not-yet-present) contact.
pub enum InsertOutcome {
    /// Inserted directly into the main list.
    Inserted,
    /// The bucket is full; `lru` is the back-of-list candidate for eviction.
    /// The caller must release any table-wide lock, probe `lru`, then call
    /// [`KBucket::resolve_eviction`] with the probe result.
    Full { lru: Contact },
}

/// A bounded ordered list of contacts at one distance-bit-index from the owner.
///
/// `main` is ordered MRU-first (front) to LRU-last (back). The replacement cache
/// is consulted only at insertion time, per SPEC_FULL §4.2; it is never
/// auto-promoted when a main-list entry is otherwise removed.
#[derive(Debug, Default)]
pub struct KBucket {
    main: VecDeque<Contact>,
    replacement: VecDeque<Contact>,
}

impl KBucket {
    pub fn new() -> Self {
        Self {
            main: VecDeque::with_capacity(K),
            replacement: VecDeque::with_capacity(R),
        }
    }

    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    pub fn replacement_len(&self) -> usize {
        self.replacement.len()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.main.iter().any(|c| &c.id == id)
    }

    /// If `contact.id` is already present, refresh it and move it to MRU.
    /// Returns `true` if it was present.
    pub fn touch(&mut self, contact: Contact) -> bool {
        if let Some(pos) = self.main.iter().position(|c| c.id == contact.id) {
            self.main.remove(pos);
            self.main.push_front(contact);
            true
        } else {
            false
        }
    }

    /// Insert a contact known not to be present yet. Caller must have already
    /// tried [`KBucket::touch`].
    pub fn try_insert(&mut self, contact: Contact) -> InsertOutcome {
        if self.main.len() < K {
            self.main.push_front(contact);
            InsertOutcome::Inserted
        } else {
            let lru = *self.main.back().expect("non-empty when at capacity");
            InsertOutcome::Full { lru }
        }
    }

    /// Resolve an eviction decision made after probing `lru` outside the lock.
    ///
    /// `lru_alive == false`: drop `lru` (if still at the back) and insert `new`
    /// at MRU. `lru_alive == true`: promote `lru` to MRU (it just answered) and
    /// push `new` into the replacement cache instead.
    pub fn resolve_eviction(&mut self, lru: Contact, new: Contact, lru_alive: bool) {
        if lru_alive {
            if let Some(pos) = self.main.iter().position(|c| c.id == lru.id) {
                self.main.remove(pos);
                self.main.push_front(lru);
            }
            self.push_replacement(new);
        } else {
            if self.main.back().map(|c| c.id) == Some(lru.id) {
                self.main.pop_back();
            }
            self.main.push_front(new);
        }
    }

    fn push_replacement(&mut self, contact: Contact) {
        if self.replacement.iter().any(|c| c.id == contact.id) {
            return;
        }
        if self.replacement.len() >= R {
            self.replacement.pop_front();
        }
        self.replacement.push_back(contact);
    }

    /// Remove a contact from the main list by id, regardless of position.
    pub fn remove(&mut self, id: &NodeId) {
        self.main.retain(|c| &c.id != id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.main.iter()
    }
}
