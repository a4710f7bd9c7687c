//! Error taxonomy of the balancer.
//!
//! Every control-plane and routing failure maps to exactly one variant so
//! callers (and the HTTP binding) can tell them apart.

use corelib::{RingError, ServerId};

use crate::provisioner::ProvisionError;
use crate::router::BackendError;

/// Result type alias for the balancer crate.
pub type Result<T> = std::result::Result<T, BalancerError>;

#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    /// Malformed control request: too many hostnames, unknown hostname,
    /// not enough replicas to satisfy `n`.
    #[error("{0}")]
    Validation(String),

    /// A requested replica name is already in use.
    #[error("replica name '{0}' is already in use")]
    NameConflict(String),

    /// Ring mutation failed (ring full, duplicate server id).
    #[error(transparent)]
    Ring(#[from] RingError),

    /// The provisioner could not start or stop a replica.
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    /// No active replicas to route to.
    #[error("no active servers")]
    NoActiveServers,

    /// The request path is not served by the replicas.
    #[error("'/{0}' endpoint does not exist in server replicas")]
    UnknownEndpoint(String),

    /// The resolved replica timed out or refused the connection.
    #[error("failed to contact {server}: {source}")]
    BackendUnavailable {
        server: String,
        #[source]
        source: BackendError,
    },

    /// The ring names a server the membership table does not know.
    #[error("ring routed to server {0} which has no active membership record")]
    RoutingInconsistency(ServerId),
}

impl BalancerError {
    /// Stable, machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            BalancerError::Validation(_) => "validation",
            BalancerError::NameConflict(_) => "name_conflict",
            BalancerError::Ring(RingError::RingFull { .. }) => "ring_full",
            BalancerError::Ring(RingError::EmptyRing) => "no_active_servers",
            BalancerError::Ring(_) => "ring",
            BalancerError::Provision(_) => "provisioning",
            BalancerError::NoActiveServers => "no_active_servers",
            BalancerError::UnknownEndpoint(_) => "unknown_endpoint",
            BalancerError::BackendUnavailable { .. } => "backend_unavailable",
            BalancerError::RoutingInconsistency(_) => "routing_inconsistency",
        }
    }
}
