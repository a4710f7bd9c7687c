//! Core library for consistent hashing implementation.
//!
//! This crate provides the fundamental abstractions for consistent hashing:
//! - Slot positions on a fixed-size ring
//! - Partitioner algorithms (virtual-node and request-key hashing)
//! - Server and virtual node abstractions
//! - The hash ring with clockwise open-addressed placement and wrap-around lookup
//! - Ownership statistics over a ring
//!
//! Nothing here performs I/O or locking; callers serialize access.

pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod slot;
pub mod topology;
pub mod vnode;

pub use error::{Result, RingError};
pub use node::{ServerId, ServerStatus};
pub use partitioner::Partitioner;
pub use ring::{HashRing, RingBuilder};
pub use slot::Slot;
pub use topology::Ownership;
pub use vnode::VirtualNode;
