//! Core partitioner trait definitions.

use crate::slot::Slot;

/// A partitioner converts keys into slots of a ring with `slots` positions.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// slot computation without synchronization overhead.
///
/// Only two properties matter for correctness: the mapping is
/// deterministic, and it is approximately uniform over `[0, slots)`.
pub trait Partitioner: Send + Sync + 'static {
    /// Converts a key into a slot.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to place
    /// * `slots` - Size of the ring's hash space; must be non-zero
    ///
    /// # Returns
    ///
    /// A slot in `[0, slots)`
    fn slot(&self, key: &[u8], slots: u32) -> Slot;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}

/// Reduce a 64-bit digest onto a ring of `slots` positions.
#[inline]
pub(crate) fn reduce(digest: u64, slots: u32) -> Slot {
    Slot((digest % u64::from(slots)) as u32)
}
