//! XXH3 partitioner, used to place request keys.

use crate::partitioner::traits::{reduce, Partitioner};
use crate::slot::Slot;
use xxhash_rust::xxh3::xxh3_64;

/// XXH3-64 partitioner.
///
/// Deliberately a different hash family from [`super::SipPartitioner`]: a
/// request key that happens to spell a virtual-node key (`"3:0"`) does not
/// land on that virtual node's slot by construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3Partitioner;

impl Partitioner for Xxh3Partitioner {
    fn slot(&self, key: &[u8], slots: u32) -> Slot {
        reduce(xxh3_64(key), slots)
    }

    fn name(&self) -> &'static str {
        "Xxh3Partitioner"
    }
}
