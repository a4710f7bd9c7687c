//! Replica membership: the authoritative set of active replicas, their
//! ring identities and addresses, and the scale-up/scale-down protocol.

mod controller;
pub mod naming;
pub mod types;

pub use controller::{ControllerConfig, MembershipController};
pub use types::{ReplicaInfo, ReplicaSet, ScaleFailure, ScaleOutcome, Target};
