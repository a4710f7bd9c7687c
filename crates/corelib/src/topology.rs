//! Ring topology views.
//!
//! Ownership calculation: how much of the slot space each server is
//! responsible for. A request slot `r` belongs to the owner of the smallest
//! occupied slot `>= r` (wrapping), so each virtual node owns the arc from
//! its predecessor (exclusive) to itself (inclusive).

use std::collections::BTreeMap;

use crate::node::ServerId;
use crate::ring::HashRing;

/// Share of the slot space owned by one server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Share {
    /// Number of request slots routed to this server.
    pub slots: u32,
    /// `slots / M`.
    pub fraction: f64,
}

/// Per-server ownership of a ring.
#[derive(Debug, Clone, Default)]
pub struct Ownership {
    shares: BTreeMap<ServerId, Share>,
}

impl Ownership {
    pub fn from_ring(ring: &HashRing) -> Self {
        let entries = ring.snapshot();
        let total = ring.capacity();
        let mut counts: BTreeMap<ServerId, u32> = BTreeMap::new();

        if entries.len() == 1 {
            counts.insert(entries[0].1, total);
        } else if let Some(&(last, _)) = entries.last() {
            let mut prev = last;
            for &(slot, server) in &entries {
                *counts.entry(server).or_default() += prev.distance_to(slot, total);
                prev = slot;
            }
        }

        let shares = counts
            .into_iter()
            .map(|(server, slots)| {
                let fraction = f64::from(slots) / f64::from(total);
                (server, Share { slots, fraction })
            })
            .collect();
        Self { shares }
    }

    pub fn get(&self, server: ServerId) -> Option<Share> {
        self.shares.get(&server).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServerId, Share)> + '_ {
        self.shares.iter().map(|(id, share)| (*id, *share))
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}
