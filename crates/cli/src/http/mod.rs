//! HTTP bindings: the balancer's control and routing API, and the replica
//! process.

mod error;
mod handlers;
mod replica;

pub use error::ApiError;
pub use handlers::{Envelope, ScaleRequest, REQUEST_KEY_HEADER, SERVED_BY_HEADER};
pub use replica::replica_router;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use balancer::{MembershipController, RequestRouter};

/// Shared state of the balancer handlers.
#[derive(Clone)]
pub struct AppState {
    pub membership: Arc<MembershipController>,
    pub router: Arc<RequestRouter>,
}

/// Create the balancer router. Control endpoints take precedence over the
/// catch-all routing endpoint; unmatched paths and methods answer with the
/// JSON error envelope.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/rep",
            get(handlers::list_replicas).fallback(handlers::unknown_route),
        )
        .route(
            "/rep/{name}",
            get(handlers::describe_replica).fallback(handlers::unknown_route),
        )
        .route(
            "/add",
            post(handlers::add_replicas).fallback(handlers::unknown_route),
        )
        .route(
            "/rm",
            delete(handlers::remove_replicas).fallback(handlers::unknown_route),
        )
        .route(
            "/{*path}",
            get(handlers::route_request).fallback(handlers::unknown_route),
        )
        .fallback(handlers::unknown_route)
        .with_state(state)
}
