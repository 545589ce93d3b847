//! 160-bit identifiers and the XOR distance metric.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Number of bits in a [`NodeId`], and the number of k-buckets a routing table holds.
pub const ID_BITS: usize = 160;
/// Number of bytes in a [`NodeId`].
pub const ID_BYTES: usize = ID_BITS / 8;

/// A 160-bit opaque identifier, used both for node identity and content keys.
///
/// Equality is bytewise and ordering is the big-endian integer interpretation of
/// the bytes, so `NodeId`'s derived `Ord` already matches the spec's distance
/// ordering when compared directly (used only as a tie-break; distances are
/// normally compared via [`Distance`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId([u8; ID_BYTES]);

impl NodeId {
    pub const ZERO: NodeId = NodeId([0u8; ID_BYTES]);

    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        NodeId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// Draw 160 random bits from an OS-backed cryptographic RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        NodeId(bytes)
    }

    /// The content hash of `data`: SHA-1, interpreted as a 160-bit id.
    pub fn content_hash(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        let mut bytes = [0u8; ID_BYTES];
        bytes.copy_from_slice(&digest);
        NodeId(bytes)
    }

    /// Parse a lowercase 40-character hex string into an id.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != ID_BYTES * 2 {
            return None;
        }
        let decoded = hex::decode(s).ok()?;
        let mut bytes = [0u8; ID_BYTES];
        bytes.copy_from_slice(&decoded);
        Some(NodeId(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// XOR distance to `other`.
    pub fn distance(&self, other: &NodeId) -> Distance {
        let mut out = [0u8; ID_BYTES];
        for i in 0..ID_BYTES {
            out[i] = self.0[i] ^ other.0[i];
        }
        Distance(out)
    }

    /// The bucket index `other` falls into within a routing table owned by `self`.
    ///
    /// Position (0 = most significant bit) of the first `1` bit in the XOR
    /// distance; identical ids use the last bucket (`ID_BITS - 1`).
    pub fn bucket_index(&self, other: &NodeId) -> usize {
        self.distance(other).bucket_index()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// XOR distance between two [`NodeId`]s, ordered as an unsigned big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Distance([u8; ID_BYTES]);

impl Distance {
    /// Position (0 = most significant bit) of the first set bit; `ID_BITS` if zero.
    fn leading_zero_bits(&self) -> usize {
        for (byte_idx, &byte) in self.0.iter().enumerate() {
            if byte != 0 {
                return byte_idx * 8 + byte.leading_zeros() as usize;
            }
        }
        ID_BITS
    }

    /// Bucket index per SPEC_FULL §4.1: the position of the first differing bit,
    /// with a zero distance (identical ids) clamped to the last bucket.
    pub fn bucket_index(&self) -> usize {
        let lz = self.leading_zero_bits();
        if lz >= ID_BITS {
            ID_BITS - 1
        } else {
            lz
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}
