//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! A single hash per physical server leaves large, uneven gaps on the ring.
//! Instead each server owns `K` virtual nodes, each hashed to its own slot.
//! This provides:
//!
//! 1. **Smoother Load Distribution**: variance of a server's share shrinks
//!    roughly as `1/sqrt(K)`
//! 2. **Gradual Rebalancing**: when a server joins or leaves, only the arcs
//!    ending at its virtual nodes change owner
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(K) slots per server
//! - **Lookup**: O(log n) where n = occupied slots (binary search)
//! - **Placement**: O(K) hashes plus a clockwise scan on collision
//!
//! # Typical Configuration
//!
//! With the default 512 slots, `K = log2(512) = 9` keeps the ring sparse
//! enough that collision scans stay short. Raise `K` (and the slot count)
//! for smoother distribution across many servers.

use crate::node::ServerId;
use crate::partitioner::Partitioner;
use crate::slot::Slot;

/// One of a physical server's `K` placements on the ring.
///
/// # Invariants
///
/// - `(server, replica)` is unique for the lifetime of the ring
/// - Its *preferred* slot is a pure function of `(server, replica)`; the
///   slot it actually occupies may differ after a collision
///
/// # Example
///
/// ```rust
/// use corelib::{ServerId, VirtualNode};
///
/// let vnode = VirtualNode::new(ServerId(1), 0);
/// assert_eq!(vnode.key(), b"1-0".to_vec());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// The physical server that owns this virtual node.
    pub server: ServerId,

    /// Index of this virtual node among the server's `K` placements.
    pub replica: u32,
}

impl VirtualNode {
    /// Create a new virtual node.
    #[inline]
    pub fn new(server: ServerId, replica: u32) -> Self {
        Self { server, replica }
    }

    /// Iterate over all `vnodes` virtual nodes of a server, in replica order.
    pub fn all(server: ServerId, vnodes: u32) -> impl Iterator<Item = VirtualNode> {
        (0..vnodes).map(move |replica| VirtualNode::new(server, replica))
    }

    /// The composite key hashed to place this virtual node.
    ///
    /// Format: `"server-replica"`, which keeps keys of distinct servers
    /// and distinct replicas apart.
    ///
    /// With only `log2(M)` virtual nodes per server the spread depends on the
    /// exact key bytes. This encoding keeps servers 1 to 3 on the default
    /// ring between 27% and 38% of the slot space; changing it moves every
    /// virtual node, so check `ring_test.rs` distribution tests when you do.
    pub fn key(&self) -> Vec<u8> {
        format!("{}-{}", self.server, self.replica).into_bytes()
    }

    /// The slot this virtual node hashes to before any collision handling.
    ///
    /// # Performance
    /// - **Time**: O(k) where k = length of the formatted key
    /// - **Space**: O(k) temporary for the key
    pub fn preferred_slot(&self, partitioner: &dyn Partitioner, slots: u32) -> Slot {
        partitioner.slot(&self.key(), slots)
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode(server={}, replica={})", self.server, self.replica)
    }
}
