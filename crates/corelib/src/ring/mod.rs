//! Consistent hash ring implementation.
//!
//! The ring manages slot occupancy and provides efficient lookup
//! operations for finding the server responsible for a request key.

pub mod ring;

pub use ring::{HashRing, RingBuilder, DEFAULT_SLOTS};
