//! Mapping of balancer errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use balancer::BalancerError;
use corelib::RingError;
use serde::Serialize;

/// Error returned by the HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub BalancerError);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    kind: &'static str,
    status: &'static str,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError(BalancerError::Validation(message.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            BalancerError::Validation(_) => StatusCode::BAD_REQUEST,
            BalancerError::NameConflict(_) => StatusCode::CONFLICT,
            BalancerError::UnknownEndpoint(_) => StatusCode::BAD_REQUEST,
            BalancerError::NoActiveServers | BalancerError::Ring(RingError::EmptyRing) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BalancerError::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            BalancerError::Ring(RingError::RingFull { .. }) => StatusCode::INSUFFICIENT_STORAGE,
            BalancerError::Ring(_)
            | BalancerError::Provision(_)
            | BalancerError::RoutingInconsistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BalancerError> for ApiError {
    fn from(err: BalancerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "request failed");
        }
        let body = ErrorBody {
            message: format!("<Error> {}", self.0),
            kind: self.0.kind(),
            status: "failure",
        };
        (status, Json(body)).into_response()
    }
}
