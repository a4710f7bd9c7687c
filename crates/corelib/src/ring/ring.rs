//! Hash ring data structure.
//!
//! The ring is a fixed-size circular slot space `[0, M)`. Each active server
//! owns exactly `K` slots, one per virtual node. Occupied slots are kept as a
//! single sequence of `(slot, server)` entries sorted by slot, which serves
//! both as the slot -> server mapping and as the sorted-slot sequence used for
//! binary search, so the two can never disagree.
//!
//! `HashRing` does no locking of its own. Mutations take `&mut self`, so a
//! caller holding a shared lock for lookups can never observe a server with
//! only part of its virtual nodes placed or removed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, RingError};
use crate::node::{ServerId, ServerStatus};
use crate::partitioner::{Partitioner, SipPartitioner, Xxh3Partitioner};
use crate::slot::Slot;
use crate::vnode::VirtualNode;

/// Default size of the slot space.
pub const DEFAULT_SLOTS: u32 = 512;

/// Consistent hash ring with open-addressed virtual-node placement.
///
/// # Example
///
/// ```rust
/// use corelib::{HashRing, ServerId};
///
/// let mut ring = HashRing::new();
/// ring.add_server(ServerId(1)).unwrap();
/// ring.add_server(ServerId(2)).unwrap();
///
/// let owner = ring.get_server(b"client-42").unwrap();
/// assert!(owner == ServerId(1) || owner == ServerId(2));
/// ```
#[derive(Clone)]
pub struct HashRing {
    slots: u32,
    vnodes_per_server: u32,
    /// Occupied slots, strictly ascending by slot.
    entries: Vec<(Slot, ServerId)>,
    servers: BTreeSet<ServerId>,
    vnode_partitioner: Arc<dyn Partitioner>,
    request_partitioner: Arc<dyn Partitioner>,
}

impl HashRing {
    /// Create an empty ring with the default 512 slots and `log2(512) = 9`
    /// virtual nodes per server.
    pub fn new() -> Self {
        Self::with_parts(
            DEFAULT_SLOTS,
            DEFAULT_SLOTS.ilog2(),
            Arc::new(SipPartitioner),
            Arc::new(Xxh3Partitioner),
        )
    }

    fn with_parts(
        slots: u32,
        vnodes_per_server: u32,
        vnode_partitioner: Arc<dyn Partitioner>,
        request_partitioner: Arc<dyn Partitioner>,
    ) -> Self {
        Self {
            slots,
            vnodes_per_server,
            entries: Vec::new(),
            servers: BTreeSet::new(),
            vnode_partitioner,
            request_partitioner,
        }
    }

    /// Place all `K` virtual nodes of `server` on the ring.
    ///
    /// Each virtual node goes to its preferred slot, or on collision to the
    /// next free slot clockwise. The operation is
    /// all-or-nothing: if any virtual node cannot be placed, the slots
    /// already taken by this call are released before returning
    /// [`RingError::RingFull`].
    ///
    /// # Errors
    ///
    /// - [`RingError::AlreadyPresent`] if `server` is already active
    /// - [`RingError::RingFull`] if the clockwise scan visited every slot
    pub fn add_server(&mut self, server: ServerId) -> Result<()> {
        if self.servers.contains(&server) {
            return Err(RingError::AlreadyPresent(server));
        }

        let mut placed = Vec::with_capacity(self.vnodes_per_server as usize);
        for vnode in VirtualNode::all(server, self.vnodes_per_server) {
            let preferred = vnode.preferred_slot(self.vnode_partitioner.as_ref(), self.slots);
            match self.next_free(preferred) {
                Some(slot) => {
                    self.occupy(slot, server);
                    placed.push(slot);
                }
                None => {
                    for slot in placed {
                        self.release(slot);
                    }
                    return Err(RingError::RingFull {
                        server,
                        slots: self.slots,
                    });
                }
            }
        }

        self.servers.insert(server);
        debug!(%server, vnodes = self.vnodes_per_server, occupied = self.entries.len(), "added server to ring");
        Ok(())
    }

    /// Remove every slot owned by `server`.
    ///
    /// Returns `false` (and leaves the ring untouched) if the server owns no
    /// slots.
    pub fn remove_server(&mut self, server: ServerId) -> bool {
        if !self.servers.remove(&server) {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|(_, owner)| *owner != server);
        debug!(%server, released = before - self.entries.len(), "removed server from ring");
        true
    }

    /// Find the server responsible for a request key.
    ///
    /// # Errors
    ///
    /// [`RingError::EmptyRing`] if no server is active.
    pub fn get_server(&self, key: &[u8]) -> Result<ServerId> {
        self.server_for_slot(self.slot_for(key))
    }

    /// The slot a request key hashes to.
    pub fn slot_for(&self, key: &[u8]) -> Slot {
        self.request_partitioner.slot(key, self.slots)
    }

    /// Owner of the smallest occupied slot `>= slot`, wrapping around to the
    /// smallest occupied slot when `slot` is past the largest one.
    pub fn server_for_slot(&self, slot: Slot) -> Result<ServerId> {
        if self.entries.is_empty() {
            return Err(RingError::EmptyRing);
        }
        let idx = self.entries.partition_point(|(occupied, _)| *occupied < slot);
        let idx = if idx == self.entries.len() { 0 } else { idx };
        Ok(self.entries[idx].1)
    }

    /// Slots currently owned by `server`, ascending.
    pub fn slots_of(&self, server: ServerId) -> Vec<Slot> {
        self.entries
            .iter()
            .filter(|(_, owner)| *owner == server)
            .map(|(slot, _)| *slot)
            .collect()
    }

    /// Owner of an occupied slot, if any.
    pub fn owner_of(&self, slot: Slot) -> Option<ServerId> {
        self.entries
            .binary_search_by_key(&slot, |(occupied, _)| *occupied)
            .ok()
            .map(|idx| self.entries[idx].1)
    }

    /// Ordered `(slot, server)` pairs. A copy; the ring cannot be mutated
    /// through it.
    pub fn snapshot(&self) -> Vec<(Slot, ServerId)> {
        self.entries.clone()
    }

    /// Occupied slots in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.entries.iter().map(|(slot, _)| *slot)
    }

    pub fn contains(&self, server: ServerId) -> bool {
        self.servers.contains(&server)
    }

    pub fn status(&self, server: ServerId) -> ServerStatus {
        if self.contains(server) {
            ServerStatus::Active
        } else {
            ServerStatus::Removed
        }
    }

    /// Active servers, ascending.
    pub fn servers(&self) -> Vec<ServerId> {
        self.servers.iter().copied().collect()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Number of occupied slots (`K` x active servers).
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the slot space, `M`.
    pub fn capacity(&self) -> u32 {
        self.slots
    }

    pub fn vnodes_per_server(&self) -> u32 {
        self.vnodes_per_server
    }

    pub fn vnode_partitioner_name(&self) -> &'static str {
        self.vnode_partitioner.name()
    }

    pub fn request_partitioner_name(&self) -> &'static str {
        self.request_partitioner.name()
    }

    /// First free slot at or clockwise of `start`, or `None` after a full lap.
    fn next_free(&self, start: Slot) -> Option<Slot> {
        let mut slot = start;
        loop {
            if self.owner_of(slot).is_none() {
                return Some(slot);
            }
            slot = slot.next(self.slots);
            if slot == start {
                return None;
            }
        }
    }

    fn occupy(&mut self, slot: Slot, server: ServerId) {
        if let Err(idx) = self.entries.binary_search_by_key(&slot, |(occupied, _)| *occupied) {
            self.entries.insert(idx, (slot, server));
        }
    }

    fn release(&mut self, slot: Slot) {
        if let Ok(idx) = self.entries.binary_search_by_key(&slot, |(occupied, _)| *occupied) {
            self.entries.remove(idx);
        }
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("slots", &self.slots)
            .field("vnodes_per_server", &self.vnodes_per_server)
            .field("servers", &self.servers)
            .field("occupied", &self.entries.len())
            .field("vnode_partitioner", &self.vnode_partitioner.name())
            .field("request_partitioner", &self.request_partitioner.name())
            .finish()
    }
}

/// Builder for [`HashRing`].
///
/// ```rust
/// use corelib::RingBuilder;
///
/// let ring = RingBuilder::new().with_slots(1024).with_vnodes(32).build().unwrap();
/// assert_eq!(ring.capacity(), 1024);
/// assert_eq!(ring.vnodes_per_server(), 32);
/// ```
pub struct RingBuilder {
    slots: u32,
    vnodes: Option<u32>,
    vnode_partitioner: Arc<dyn Partitioner>,
    request_partitioner: Arc<dyn Partitioner>,
}

impl RingBuilder {
    pub fn new() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            vnodes: None,
            vnode_partitioner: Arc::new(SipPartitioner),
            request_partitioner: Arc::new(Xxh3Partitioner),
        }
    }

    /// Size of the slot space `M`.
    pub fn with_slots(mut self, slots: u32) -> Self {
        self.slots = slots;
        self
    }

    /// Virtual nodes per server `K`. Defaults to `log2(M)`.
    pub fn with_vnodes(mut self, vnodes: u32) -> Self {
        self.vnodes = Some(vnodes);
        self
    }

    pub fn with_vnode_partitioner(mut self, partitioner: impl Partitioner) -> Self {
        self.vnode_partitioner = Arc::new(partitioner);
        self
    }

    pub fn with_request_partitioner(mut self, partitioner: impl Partitioner) -> Self {
        self.request_partitioner = Arc::new(partitioner);
        self
    }

    /// Build an empty ring.
    ///
    /// # Errors
    ///
    /// [`RingError::InvalidConfig`] when the slot space is empty, `K` is
    /// zero, or `K` exceeds `M` (a single server could never be placed).
    pub fn build(self) -> Result<HashRing> {
        if self.slots == 0 {
            return Err(RingError::InvalidConfig("slot count must be positive".into()));
        }
        let vnodes = self.vnodes.unwrap_or_else(|| self.slots.ilog2().max(1));
        if vnodes == 0 {
            return Err(RingError::InvalidConfig(
                "virtual nodes per server must be positive".into(),
            ));
        }
        if vnodes > self.slots {
            return Err(RingError::InvalidConfig(format!(
                "{} virtual nodes per server cannot fit in {} slots",
                vnodes, self.slots
            )));
        }
        Ok(HashRing::with_parts(
            self.slots,
            vnodes,
            self.vnode_partitioner,
            self.request_partitioner,
        ))
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sends every key to the same slot, forcing collisions.
    struct ConstantPartitioner(u32);

    impl Partitioner for ConstantPartitioner {
        fn slot(&self, _key: &[u8], slots: u32) -> Slot {
            Slot(self.0 % slots)
        }

        fn name(&self) -> &'static str {
            "ConstantPartitioner"
        }
    }

    #[test]
    fn test_collisions_step_forward() {
        let mut ring = RingBuilder::new()
            .with_slots(16)
            .with_vnodes(3)
            .with_vnode_partitioner(ConstantPartitioner(14))
            .build()
            .unwrap();

        ring.add_server(ServerId(1)).unwrap();
        assert_eq!(ring.slots_of(ServerId(1)), vec![Slot(0), Slot(14), Slot(15)]);

        // Second server keeps stepping past the first one's slots.
        ring.add_server(ServerId(2)).unwrap();
        assert_eq!(ring.slots_of(ServerId(2)), vec![Slot(1), Slot(2), Slot(3)]);
    }

    #[test]
    fn test_ring_full_rolls_back() {
        let mut ring = RingBuilder::new()
            .with_slots(8)
            .with_vnodes(3)
            .with_vnode_partitioner(ConstantPartitioner(0))
            .build()
            .unwrap();

        ring.add_server(ServerId(1)).unwrap();
        ring.add_server(ServerId(2)).unwrap();
        let before = ring.snapshot();

        let err = ring.add_server(ServerId(3)).unwrap_err();
        assert_eq!(err, RingError::RingFull { server: ServerId(3), slots: 8 });
        assert_eq!(ring.snapshot(), before);
        assert!(!ring.contains(ServerId(3)));
        assert_eq!(ring.status(ServerId(3)), ServerStatus::Removed);
    }

    #[test]
    fn test_lookup_exact_slot_hits_owner() {
        let mut ring = RingBuilder::new()
            .with_slots(16)
            .with_vnodes(1)
            .with_vnode_partitioner(ConstantPartitioner(5))
            .build()
            .unwrap();
        ring.add_server(ServerId(1)).unwrap();
        ring.add_server(ServerId(2)).unwrap(); // steps to 6

        assert_eq!(ring.server_for_slot(Slot(5)).unwrap(), ServerId(1));
        assert_eq!(ring.server_for_slot(Slot(6)).unwrap(), ServerId(2));
        assert_eq!(ring.server_for_slot(Slot(0)).unwrap(), ServerId(1));
        // Past the largest occupied slot: wrap to the smallest.
        assert_eq!(ring.server_for_slot(Slot(7)).unwrap(), ServerId(1));
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        assert!(matches!(
            RingBuilder::new().with_slots(0).build(),
            Err(RingError::InvalidConfig(_))
        ));
        assert!(matches!(
            RingBuilder::new().with_vnodes(0).build(),
            Err(RingError::InvalidConfig(_))
        ));
        assert!(matches!(
            RingBuilder::new().with_slots(4).with_vnodes(5).build(),
            Err(RingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_default_vnodes_is_log2_slots() {
        assert_eq!(HashRing::new().vnodes_per_server(), 9);
        let ring = RingBuilder::new().with_slots(1024).build().unwrap();
        assert_eq!(ring.vnodes_per_server(), 10);
    }
}
