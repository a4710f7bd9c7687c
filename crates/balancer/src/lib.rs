//! Consistent-hash request balancer.
//!
//! [`membership::MembershipController`] owns the ring and the replica table
//! and drives a [`provisioner::Provisioner`] to start and stop backends;
//! [`router::RequestRouter`] maps each request key to one replica and
//! proxies the call to it.

pub mod error;
pub mod membership;
pub mod provisioner;
pub mod router;

pub use error::{BalancerError, Result};
pub use membership::{
    ControllerConfig, MembershipController, ReplicaInfo, ReplicaSet, ScaleFailure, ScaleOutcome,
    Target,
};
pub use provisioner::{
    DockerProvisioner, DockerSettings, ProvisionError, Provisioner, StaticProvisioner,
};
pub use router::{
    BackendClient, BackendError, BackendResponse, HttpBackendClient, RequestKey, RequestRouter,
    RoutedResponse, RoutingTable,
};
