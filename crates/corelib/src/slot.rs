//! Slot positions on the ring.
//!
//! The ring is a fixed-size circular space `[0, M)`. A [`Slot`] is one
//! discrete position in it; `M` is owned by the ring, so operations that
//! need to wrap take it as an argument.

use std::fmt;

/// One position in the ring's hash space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Slot(pub u32);

impl Slot {
    /// The slot immediately clockwise of this one, wrapping at `slots`.
    #[inline]
    pub fn next(self, slots: u32) -> Slot {
        Slot((self.0 + 1) % slots)
    }

    /// Clockwise distance from `self` to `other` on a ring of `slots` positions.
    #[inline]
    pub fn distance_to(self, other: Slot, slots: u32) -> u32 {
        if other.0 >= self.0 {
            other.0 - self.0
        } else {
            slots - self.0 + other.0
        }
    }

    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
