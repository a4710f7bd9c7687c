//! Request routing: endpoint check, ring lookup, proxy call.

mod backend;
mod table;

pub use backend::{BackendClient, BackendError, BackendResponse, HttpBackendClient, DEFAULT_PROXY_TIMEOUT};
pub use table::{Endpoint, RequestKey, RoutingTable};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{BalancerError, Result};
use crate::membership::MembershipController;

/// A backend response together with the replica that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedResponse {
    pub server: String,
    pub response: BackendResponse,
}

/// Forwards requests on served endpoints to the replica owning their key.
///
/// A failed proxy call is reported, never retried on another replica: a
/// key maps to exactly one server.
pub struct RequestRouter {
    membership: Arc<MembershipController>,
    table: RoutingTable,
    backend: Arc<dyn BackendClient>,
}

impl RequestRouter {
    pub fn new(
        membership: Arc<MembershipController>,
        table: RoutingTable,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        Self {
            membership,
            table,
            backend,
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Route a GET on `path`. Without a `key`, a random one is drawn.
    ///
    /// Checks run cheapest first: empty membership, then unknown endpoint,
    /// both before any ring lookup.
    pub async fn route(&self, path: &str, key: Option<RequestKey>) -> Result<RoutedResponse> {
        if self.membership.is_empty() {
            return Err(BalancerError::NoActiveServers);
        }
        let endpoint = self
            .table
            .resolve(path)
            .ok_or_else(|| BalancerError::UnknownEndpoint(table::normalize(path).to_string()))?;

        let key = key.unwrap_or_else(RequestKey::random);
        let target = self.membership.resolve(key.as_bytes())?;
        debug!(path = endpoint.backend_path(), replica = %target.name, address = %target.address, "routing request");

        match self.backend.get(&target.address, endpoint.backend_path()).await {
            Ok(response) => {
                metrics::counter!("balancer_requests_routed_total", "replica" => target.name.clone())
                    .increment(1);
                Ok(RoutedResponse {
                    server: target.name,
                    response,
                })
            }
            Err(source) => {
                metrics::counter!("balancer_backend_failures_total", "replica" => target.name.clone())
                    .increment(1);
                warn!(replica = %target.name, error = %source, "backend call failed");
                Err(BalancerError::BackendUnavailable {
                    server: target.name,
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRouter")
            .field("endpoints", &self.table.paths())
            .finish()
    }
}
