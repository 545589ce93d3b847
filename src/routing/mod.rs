//! Routing table and k-bucket implementation.

pub mod bucket;
pub mod table;

pub use bucket::{InsertOutcome, KBucket, K, R};
pub use table::{LivenessProbe, RoutingTable};
