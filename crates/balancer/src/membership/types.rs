//! Value types reported by the membership controller.

use corelib::{ServerId, ServerStatus, Slot};
use serde::Serialize;

/// Snapshot of the active replica set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaSet {
    #[serde(rename = "N")]
    pub count: usize,
    /// Replica names, ascending.
    pub replicas: Vec<String>,
}

/// One replica that a scale operation could not add or remove cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleFailure {
    pub name: String,
    pub reason: String,
}

/// Result of a scale operation: the active set afterwards, plus the
/// replicas that failed along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleOutcome {
    pub replicas: ReplicaSet,
    pub failures: Vec<ScaleFailure>,
}

impl ScaleOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The replica a request key resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: ServerId,
    pub name: String,
    pub address: String,
}

/// Full view of one replica, including the ring slots it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaInfo {
    pub name: String,
    pub id: ServerId,
    pub address: String,
    pub status: ServerStatus,
    pub slots: Vec<Slot>,
}
