//! Server identities on the consistent hash ring.
//!
//! Servers are identified by a compact `ServerId` that is cheap to compare,
//! hash and copy. Human-facing names live one layer up, in the membership
//! controller, which allocates the ids.

use std::fmt;

/// Ring-internal identifier of a physical server.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ServerId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ServerId {
    fn from(id: u64) -> Self {
        ServerId(id)
    }
}

/// Whether a server is eligible to receive routed traffic.
///
/// There is no draining state: a server is `Active` from the moment its
/// virtual nodes are placed until they are removed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ServerStatus {
    Active,
    Removed,
}

impl ServerStatus {
    pub fn is_active(self) -> bool {
        matches!(self, ServerStatus::Active)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Active => f.write_str("active"),
            ServerStatus::Removed => f.write_str("removed"),
        }
    }
}
