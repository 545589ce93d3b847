//! In-memory value store and the set of keys this node authored.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Keys are exactly 20 bytes, rendered as 40 lowercase hex characters.
pub const KEY_HEX_LEN: usize = 40;

pub fn is_valid_key_hex(key_hex: &str) -> bool {
    key_hex.len() == KEY_HEX_LEN && key_hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// In-memory keyed byte store.
///
/// Every store and load copies the buffer: no internal byte vector is ever
/// aliased to caller code or to wire buffers (SPEC_FULL §5, copy discipline).
#[derive(Default)]
pub struct ValueStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store_local(&self, key_hex: String, value: &[u8]) {
        self.values.write().await.insert(key_hex, value.to_vec());
    }

    pub async fn load_local(&self, key_hex: &str) -> Option<Vec<u8>> {
        self.values.read().await.get(key_hex).cloned()
    }

    pub async fn contains(&self, key_hex: &str) -> bool {
        self.values.read().await.contains_key(key_hex)
    }
}

/// The set of keys this node authored via its own `put`.
///
/// Disjoint from the value store's general contents: only origin keys are
/// subject to periodic republish.
#[derive(Default)]
pub struct OriginSet {
    keys: RwLock<HashSet<String>>,
}

impl OriginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key_hex: String) {
        self.keys.write().await.insert(key_hex);
    }

    /// A point-in-time copy of the origin keys, for republish to iterate
    /// over without holding the lock during subsequent I/O.
    pub async fn snapshot(&self) -> Vec<String> {
        self.keys.read().await.iter().cloned().collect()
    }
}
