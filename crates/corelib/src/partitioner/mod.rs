//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into slots
//! that can be placed on the hash ring. The ring uses one partitioner for
//! virtual-node keys and a distinct one for request keys.

pub mod sip;
pub mod traits;
pub mod xxh3;

pub use sip::SipPartitioner;
pub use traits::Partitioner;
pub use xxh3::Xxh3Partitioner;

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(partitioner: &dyn Partitioner) -> Vec<usize> {
        let mut buckets = vec![0usize; 8];
        for i in 0..8000u32 {
            let slot = partitioner.slot(format!("key-{}", i).as_bytes(), 512);
            assert!(slot.value() < 512);
            buckets[(slot.value() / 64) as usize] += 1;
        }
        buckets
    }

    #[test]
    fn test_partitioners_are_roughly_uniform() {
        for partitioner in [&SipPartitioner as &dyn Partitioner, &Xxh3Partitioner] {
            for count in spread(partitioner) {
                // 1000 expected per bucket
                assert!(
                    (700..=1300).contains(&count),
                    "{} bucket count {} out of range",
                    partitioner.name(),
                    count
                );
            }
        }
    }

    #[test]
    fn test_partitioners_differ() {
        let key = b"1:0";
        let same = (0..64u32)
            .filter(|i| {
                let k = [key.as_slice(), &i.to_le_bytes()].concat();
                SipPartitioner.slot(&k, 512) == Xxh3Partitioner.slot(&k, 512)
            })
            .count();
        assert!(same < 8, "hash families agree on {} of 64 keys", same);
    }
}
