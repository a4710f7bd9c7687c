//! Balancer HTTP handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use balancer::{BalancerError, RequestKey, ScaleFailure, ScaleOutcome};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;

/// Header carrying a client-chosen routing key.
pub const REQUEST_KEY_HEADER: &str = "x-request-key";
/// Response header naming the replica that served a routed request.
pub const SERVED_BY_HEADER: &str = "x-served-by";

/// Body of `POST /add` and `DELETE /rm`.
#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub n: i64,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

impl ScaleRequest {
    fn count(&self) -> Result<usize, ApiError> {
        usize::try_from(self.n)
            .map_err(|_| ApiError::validation(format!("n must be non-negative, got {}", self.n)))
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: T,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<ScaleFailure>,
}

impl<T> Envelope<T> {
    fn successful(message: T) -> Self {
        Self {
            message,
            status: "successful",
            failed: Vec::new(),
        }
    }
}

fn scale_response(outcome: ScaleOutcome) -> Json<Envelope<balancer::ReplicaSet>> {
    let mut envelope = Envelope::successful(outcome.replicas);
    envelope.failed = outcome.failures;
    Json(envelope)
}

fn parse(payload: Result<Json<ScaleRequest>, JsonRejection>) -> Result<(usize, Vec<String>), ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let n = request.count()?;
    Ok((n, request.hostnames))
}

/// `GET /rep`
#[tracing::instrument(skip(state))]
pub async fn list_replicas(State(state): State<AppState>) -> Json<Envelope<balancer::ReplicaSet>> {
    Json(Envelope::successful(state.membership.list()))
}

/// `GET /rep/{name}`: one replica with its ring slots.
#[tracing::instrument(skip(state))]
pub async fn describe_replica(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Envelope<ReplicaView>>, ApiError> {
    let info = state
        .membership
        .describe(&name)
        .ok_or_else(|| ApiError::validation(format!("hostname '{}' is not a replica", name)))?;
    Ok(Json(Envelope::successful(ReplicaView {
        name: info.name,
        id: info.id.0,
        address: info.address,
        status: info.status.to_string(),
        slots: info.slots.iter().map(|slot| slot.value()).collect(),
    })))
}

#[derive(Debug, Serialize)]
pub struct ReplicaView {
    pub name: String,
    pub id: u64,
    pub address: String,
    pub status: String,
    pub slots: Vec<u32>,
}

/// `POST /add`
#[tracing::instrument(skip_all)]
pub async fn add_replicas(
    State(state): State<AppState>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<Json<Envelope<balancer::ReplicaSet>>, ApiError> {
    let (n, hostnames) = parse(payload)?;
    let outcome = state.membership.scale_up(n, hostnames).await?;
    Ok(scale_response(outcome))
}

/// `DELETE /rm`
#[tracing::instrument(skip_all)]
pub async fn remove_replicas(
    State(state): State<AppState>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<Json<Envelope<balancer::ReplicaSet>>, ApiError> {
    let (n, hostnames) = parse(payload)?;
    let outcome = state.membership.scale_down(n, hostnames).await?;
    Ok(scale_response(outcome))
}

/// `GET /{*path}`: forward to the replica owning the request key and relay
/// its status and body.
#[tracing::instrument(skip(state, headers))]
pub async fn route_request(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = headers
        .get(REQUEST_KEY_HEADER)
        .map(|value| RequestKey::from_client(value.as_bytes()));
    let routed = state.router.route(&path, key).await?;

    let status = StatusCode::from_u16(routed.response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, routed.response.body).into_response();
    let response_headers = response.headers_mut();
    if let Some(value) = routed
        .response
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response_headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&routed.server) {
        response_headers.insert(SERVED_BY_HEADER, value);
    }
    Ok(response)
}

/// Anything no route serves: unknown paths and unsupported methods. Same
/// order as routing: an empty replica set is reported first.
#[tracing::instrument(skip(state))]
pub async fn unknown_route(State(state): State<AppState>, method: Method, uri: Uri) -> ApiError {
    if state.membership.is_empty() {
        return ApiError(BalancerError::NoActiveServers);
    }
    ApiError(BalancerError::UnknownEndpoint(
        uri.path().trim_matches('/').to_string(),
    ))
}
