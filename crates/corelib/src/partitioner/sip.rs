//! SipHash partitioner, used to place virtual nodes.

use crate::partitioner::traits::{reduce, Partitioner};
use crate::slot::Slot;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// SipHash-1-3 partitioner with fixed (zero) keys, so placement is stable
/// across processes and restarts.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipPartitioner;

impl Partitioner for SipPartitioner {
    fn slot(&self, key: &[u8], slots: u32) -> Slot {
        let mut hasher = SipHasher13::new();
        hasher.write(key);
        reduce(hasher.finish(), slots)
    }

    fn name(&self) -> &'static str {
        "SipPartitioner"
    }
}
