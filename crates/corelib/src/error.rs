//! Error types for the core library.

use crate::node::ServerId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors that can occur while mutating or querying the hash ring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The server already owns virtual nodes on the ring.
    #[error("server {0} is already on the ring")]
    AlreadyPresent(ServerId),

    /// The clockwise scan visited every slot without finding a free one.
    ///
    /// This is a capacity misconfiguration (too many virtual nodes for the
    /// slot count), not a transient condition.
    #[error("hash ring is full: no free slot among {slots} while placing server {server}")]
    RingFull {
        /// The server whose placement failed.
        server: ServerId,
        /// Total slot count of the ring.
        slots: u32,
    },

    /// Lookup on a ring with no active servers.
    #[error("hash ring has no active servers")]
    EmptyRing,

    /// Ring parameters that cannot describe a usable ring.
    #[error("invalid ring configuration: {0}")]
    InvalidConfig(String),
}
